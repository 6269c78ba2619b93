use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use roxmltree::{Document, Node};

use crate::app::{Tilemap, Vec2, TILE_EMPTY, TILE_FLOOR, TILE_WALL};

use super::{
    BoxPlacement, DoorPlacement, LevelData, LevelError, LevelErrorCode, SkeletonPlacement,
    SourceLocation, DEFAULT_PLAYER_SPAWN,
};

/// Tiled stores flip flags in the top bits of every gid.
const GID_MASK: u32 = 0x1FFF_FFFF;
const GROUND_LAYER: &str = "Ground";
const WALLS_LAYER: &str = "Walls";
const BOXES_GROUP: &str = "Boxes";
const DOOR_GROUP: &str = "Door";
const ENEMIES_GROUP: &str = "Enemies";
const PLAYER_GROUP: &str = "Player";
const COLLIDES_PROPERTY: &str = "collides";

pub fn load_level_file(path: &Path) -> Result<LevelData, LevelError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelError {
        code: LevelErrorCode::ReadFile,
        message: format!("failed to read level file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    parse_level_str(path, &raw)
}

pub fn parse_level_str(file_path: &Path, raw: &str) -> Result<LevelData, LevelError> {
    let doc = Document::parse(raw).map_err(|error| LevelError {
        code: LevelErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let parser = LevelParser {
        doc: &doc,
        file_path,
    };
    parser.parse()
}

struct LevelParser<'a, 'input> {
    doc: &'a Document<'input>,
    file_path: &'a Path,
}

impl<'a, 'input> LevelParser<'a, 'input> {
    fn parse(&self) -> Result<LevelData, LevelError> {
        let root = self.doc.root_element();
        if root.tag_name().name() != "map" {
            return Err(self.error(
                LevelErrorCode::InvalidRoot,
                "root element must be <map>".to_string(),
                root,
            ));
        }

        let width: u32 = self.required_attribute(root, "width")?;
        let height: u32 = self.required_attribute(root, "height")?;
        let tile_width: f32 = self.required_attribute(root, "tilewidth")?;
        let tile_height: f32 = self.required_attribute(root, "tileheight")?;
        if tile_width <= 0.0 || tile_width != tile_height {
            return Err(self.error(
                LevelErrorCode::InvalidValue,
                format!("tiles must be square and non-empty, got {tile_width}x{tile_height}"),
                root,
            ));
        }

        let colliding = self.colliding_gids(root)?;
        let ground = self.tile_layer(root, GROUND_LAYER, width, height)?;
        let walls = self.tile_layer(root, WALLS_LAYER, width, height)?;
        let tiles = ground
            .iter()
            .zip(&walls)
            .map(|(&ground_gid, &wall_gid)| match (ground_gid, wall_gid) {
                (_, wall) if wall != 0 => TILE_WALL,
                (0, _) => TILE_EMPTY,
                _ => TILE_FLOOR,
            })
            .collect();
        let solid = walls
            .iter()
            .map(|gid| *gid != 0 && colliding.contains(gid))
            .collect();
        let tilemap = Tilemap::new(width, height, tile_width, Vec2::ZERO, tiles, solid)
            .map_err(|error| self.error(LevelErrorCode::InvalidValue, error.to_string(), root))?;

        let boxes = self
            .objects(self.object_group(root, BOXES_GROUP)?)
            .map(|object| {
                let content = object
                    .attribute("name")
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        self.error(
                            LevelErrorCode::MissingAttribute,
                            "box object needs a name holding its content label".to_string(),
                            object,
                        )
                    })?;
                Ok(BoxPlacement {
                    position: self.tile_object_center(object)?,
                    content: content.to_string(),
                })
            })
            .collect::<Result<Vec<_>, LevelError>>()?;

        let door_group = self.object_group(root, DOOR_GROUP)?;
        let door_object = self.objects(door_group).next().ok_or_else(|| {
            self.error(
                LevelErrorCode::MissingObject,
                "door layer has no door object".to_string(),
                door_group,
            )
        })?;
        let door = DoorPlacement {
            position: self.tile_object_center(door_object)?,
        };

        let skeletons = self
            .objects(self.object_group(root, ENEMIES_GROUP)?)
            .map(|object| {
                Ok(SkeletonPlacement {
                    position: self.object_point(object)?,
                })
            })
            .collect::<Result<Vec<_>, LevelError>>()?;

        let player_spawn = match self.find_child(root, "objectgroup", PLAYER_GROUP) {
            Some(group) => match self.objects(group).next() {
                Some(object) => self.object_point(object)?,
                None => DEFAULT_PLAYER_SPAWN,
            },
            None => DEFAULT_PLAYER_SPAWN,
        };

        Ok(LevelData {
            tilemap,
            player_spawn,
            boxes,
            skeletons,
            door,
        })
    }

    /// Global tile ids whose tileset entry carries `collides=true`.
    fn colliding_gids(&self, root: Node) -> Result<BTreeSet<u32>, LevelError> {
        let mut colliding = BTreeSet::new();
        for tileset in element_children(root).filter(|node| node.has_tag_name("tileset")) {
            let first_gid: u32 = self.required_attribute(tileset, "firstgid")?;
            for tile in element_children(tileset).filter(|node| node.has_tag_name("tile")) {
                let local_id: u32 = self.required_attribute(tile, "id")?;
                let collides = tile
                    .descendants()
                    .filter(|node| node.has_tag_name("property"))
                    .any(|property| {
                        property.attribute("name") == Some(COLLIDES_PROPERTY)
                            && property.attribute("value") == Some("true")
                    });
                if collides {
                    colliding.insert(first_gid.saturating_add(local_id));
                }
            }
        }
        Ok(colliding)
    }

    fn tile_layer(
        &self,
        root: Node,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<Vec<u32>, LevelError> {
        let layer = self.find_child(root, "layer", name).ok_or_else(|| {
            self.error(
                LevelErrorCode::MissingLayer,
                format!("missing tile layer '{name}'"),
                root,
            )
        })?;
        let data = element_children(layer)
            .find(|node| node.has_tag_name("data"))
            .ok_or_else(|| {
                self.error(
                    LevelErrorCode::MissingLayer,
                    format!("tile layer '{name}' has no <data>"),
                    layer,
                )
            })?;
        if let Some(encoding) = data.attribute("encoding") {
            if encoding != "csv" {
                return Err(self.error(
                    LevelErrorCode::InvalidValue,
                    format!("tile layer '{name}' uses unsupported encoding '{encoding}'"),
                    data,
                ));
            }
        }

        let gids = data
            .text()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(|cell| {
                cell.parse::<u32>().map(|gid| gid & GID_MASK).map_err(|_| {
                    self.error(
                        LevelErrorCode::InvalidValue,
                        format!("tile layer '{name}' has non-numeric cell '{cell}'"),
                        data,
                    )
                })
            })
            .collect::<Result<Vec<_>, LevelError>>()?;

        let expected = width as usize * height as usize;
        if gids.len() != expected {
            return Err(self.error(
                LevelErrorCode::TileCountMismatch,
                format!(
                    "tile layer '{name}' has {} cells, expected {expected} ({width}x{height})",
                    gids.len()
                ),
                data,
            ));
        }
        Ok(gids)
    }

    fn object_group(&self, root: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>, LevelError> {
        self.find_child(root, "objectgroup", name).ok_or_else(|| {
            self.error(
                LevelErrorCode::MissingLayer,
                format!("missing object layer '{name}'"),
                root,
            )
        })
    }

    fn find_child(
        &self,
        root: Node<'a, 'input>,
        tag: &str,
        name: &str,
    ) -> Option<Node<'a, 'input>> {
        element_children(root)
            .find(|node| node.has_tag_name(tag) && node.attribute("name") == Some(name))
    }

    fn objects(&self, group: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
        element_children(group).filter(|node| node.has_tag_name("object"))
    }

    fn object_point(&self, object: Node) -> Result<Vec2, LevelError> {
        Ok(Vec2::new(
            self.required_attribute(object, "x")?,
            self.required_attribute(object, "y")?,
        ))
    }

    /// Tile objects are anchored at their bottom-left corner.
    fn tile_object_center(&self, object: Node) -> Result<Vec2, LevelError> {
        let x: f32 = self.required_attribute(object, "x")?;
        let y: f32 = self.required_attribute(object, "y")?;
        let width: f32 = self.required_attribute(object, "width")?;
        let height: f32 = self.required_attribute(object, "height")?;
        Ok(Vec2::new(
            x.floor() + width.floor() * 0.5,
            y.floor() - height.floor() * 0.5,
        ))
    }

    fn required_attribute<T: FromStr + Finite>(&self, node: Node, name: &str) -> Result<T, LevelError> {
        let raw = node.attribute(name).ok_or_else(|| {
            self.error(
                LevelErrorCode::MissingAttribute,
                format!("<{}> is missing attribute '{name}'", node.tag_name().name()),
                node,
            )
        })?;
        raw.trim()
            .parse::<T>()
            .ok()
            .filter(Finite::is_finite_value)
            .ok_or_else(|| {
                self.error(
                    LevelErrorCode::InvalidValue,
                    format!(
                        "attribute '{name}' on <{}> has invalid value '{raw}'",
                        node.tag_name().name()
                    ),
                    node,
                )
            })
    }

    fn error(&self, code: LevelErrorCode, message: String, node: Node) -> LevelError {
        let pos = self.doc.text_pos_at(node.range().start);
        LevelError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

trait Finite {
    fn is_finite_value(&self) -> bool;
}

impl Finite for f32 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl Finite for u32 {
    fn is_finite_value(&self) -> bool {
        true
    }
}

fn element_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}
