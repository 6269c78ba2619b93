use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{
    BodyKind, Camera2D, Entity, HeartIcon, HudView, SceneWorld, Tilemap, Vec2, TILE_FLOOR,
    TILE_WALL,
};
use crate::sprite_keys::sprite_path_for_key;

use super::overlay::{draw_banner, draw_overlay, overlay_lines, OverlayData};
use super::raster::{
    draw_filled_rect, draw_rect_outline, draw_sprite_centered, tint_color, LoadedSprite,
    SpriteStyle,
};
use super::transform::{camera_pixels_per_world, world_to_screen_px};
use super::Viewport;

const CLEAR_COLOR: [u8; 4] = [24, 20, 37, 255];
const TILE_FALLBACK_FLOOR_COLOR: [u8; 4] = [62, 53, 70, 255];
const TILE_FALLBACK_WALL_COLOR: [u8; 4] = [120, 104, 96, 255];
const DEBUG_DYNAMIC_BODY_COLOR: [u8; 4] = [80, 230, 120, 255];
const DEBUG_STATIC_BODY_COLOR: [u8; 4] = [90, 160, 255, 255];
const DEBUG_MASSLESS_BODY_COLOR: [u8; 4] = [250, 220, 70, 255];
const DEBUG_SOLID_TILE_COLOR: [u8; 4] = [230, 70, 70, 160];
const PLACEHOLDER_HALF_SIZE_WORLD: f32 = 4.0;
const HUD_SCALE: f32 = 4.0;
const HUD_MARGIN_PX: i32 = 12;
const HEART_FALLBACK_SIZE_PX: i32 = 28;
const HEART_FULL_FALLBACK_COLOR: [u8; 4] = [220, 40, 60, 255];
const HEART_EMPTY_FALLBACK_COLOR: [u8; 4] = [70, 60, 70, 255];

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    asset_root: PathBuf,
    sprites: SpriteCache,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            asset_root,
            sprites: SpriteCache::default(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(window: Arc<Window>, width: u32, height: u32) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        hud: Option<&HudView>,
        overlay: Option<&OverlayData>,
    ) -> Result<(), Error> {
        let Viewport { width, height } = self.viewport;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let sprites = &mut self.sprites;
        let asset_root = self.asset_root.as_path();
        let frame = self.pixels.frame_mut();
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        let camera = world.camera();
        if let Some(tilemap) = world.tilemap() {
            draw_tilemap(frame, self.viewport, camera, tilemap, sprites, asset_root);
        }
        for entity in world.entities() {
            draw_entity(frame, self.viewport, camera, entity, sprites, asset_root);
        }

        if let Some(hud) = hud {
            if hud.show_bodies {
                draw_debug_bodies(frame, self.viewport, world);
            }
            draw_hearts(frame, self.viewport, &hud.hearts, sprites, asset_root);
            if let Some(banner) = &hud.banner {
                draw_banner(frame, width, height, banner);
            }
        }
        if let Some(data) = overlay {
            let scene_lines = hud.map(|hud| hud.debug_lines.as_slice()).unwrap_or(&[]);
            draw_overlay(frame, width, height, &overlay_lines(data, scene_lines));
        }

        self.pixels.render()
    }
}

/// Decoded sprites by animation key. Failed loads are cached as `None` and warned once.
#[derive(Default)]
struct SpriteCache {
    loaded: HashMap<String, Option<LoadedSprite>>,
    warned: HashSet<String>,
}

impl SpriteCache {
    fn get(&mut self, asset_root: &Path, key: &str) -> Option<&LoadedSprite> {
        if !self.loaded.contains_key(key) {
            let sprite = match load_sprite(asset_root, key) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    if self.warned.insert(key.to_string()) {
                        warn!(
                            sprite_key = key,
                            reason = reason.as_str(),
                            "renderer_sprite_load_failed_using_placeholder"
                        );
                    }
                    None
                }
            };
            self.loaded.insert(key.to_string(), sprite);
        }
        self.loaded.get(key).and_then(Option::as_ref)
    }
}

fn load_sprite(asset_root: &Path, key: &str) -> Result<LoadedSprite, String> {
    let path = sprite_path_for_key(asset_root, key).map_err(|error| format!("invalid_key:{error}"))?;
    let reader = ImageReader::open(&path).map_err(|error| format!("file_open_failed:{error}"))?;
    let image = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?
        .to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn tile_sprite_key(tile_id: u16) -> Option<&'static str> {
    match tile_id {
        TILE_FLOOR => Some("tile/floor"),
        TILE_WALL => Some("tile/wall"),
        _ => None,
    }
}

fn draw_tilemap(
    frame: &mut [u8],
    viewport: Viewport,
    camera: &Camera2D,
    tilemap: &Tilemap,
    sprites: &mut SpriteCache,
    asset_root: &Path,
) {
    let scale = camera_pixels_per_world(camera);
    let Some((x_min, x_max, y_min, y_max)) = visible_tiles(camera, viewport, tilemap) else {
        return;
    };
    let tile_px = (tilemap.tile_size() * scale).ceil() as i32;

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let Some(tile_id) = tilemap.tile_at(x, y) else {
                continue;
            };
            let Some(key) = tile_sprite_key(tile_id) else {
                continue;
            };
            let Some(center) = tilemap.tile_center_world(x, y) else {
                continue;
            };
            let (cx, cy) = world_to_screen_px(camera, (viewport.width, viewport.height), center);
            if let Some(sprite) = sprites.get(asset_root, key) {
                let style = SpriteStyle {
                    scale,
                    ..SpriteStyle::default()
                };
                draw_sprite_centered(frame, viewport.width, viewport.height, cx, cy, sprite, style);
                continue;
            }
            let color = if tile_id == TILE_WALL {
                TILE_FALLBACK_WALL_COLOR
            } else {
                TILE_FALLBACK_FLOOR_COLOR
            };
            draw_filled_rect(
                frame,
                viewport.width,
                viewport.height,
                cx - tile_px / 2,
                cy - tile_px / 2,
                tile_px,
                tile_px,
                color,
            );
        }
    }
}

fn visible_tiles(
    camera: &Camera2D,
    viewport: Viewport,
    tilemap: &Tilemap,
) -> Option<(u32, u32, u32, u32)> {
    if tilemap.width() == 0 || tilemap.height() == 0 {
        return None;
    }
    let scale = camera_pixels_per_world(camera);
    let half = Vec2::new(
        viewport.width as f32 / (2.0 * scale),
        viewport.height as f32 / (2.0 * scale),
    );
    let (x_min, x_max, y_min, y_max) =
        tilemap.tile_span(camera.position - half, camera.position + half);
    let x_min = x_min.max(0);
    let y_min = y_min.max(0);
    let x_max = x_max.min(tilemap.width() as i64 - 1);
    let y_max = y_max.min(tilemap.height() as i64 - 1);
    if x_min > x_max || y_min > y_max {
        return None;
    }
    Some((x_min as u32, x_max as u32, y_min as u32, y_max as u32))
}

fn draw_entity(
    frame: &mut [u8],
    viewport: Viewport,
    camera: &Camera2D,
    entity: &Entity,
    sprites: &mut SpriteCache,
    asset_root: &Path,
) {
    let scale = camera_pixels_per_world(camera);
    let (cx, cy) = world_to_screen_px(
        camera,
        (viewport.width, viewport.height),
        entity.transform.position,
    );
    if let Some(sprite) = entity
        .renderable
        .sprite_key()
        .and_then(|key| sprites.get(asset_root, key))
    {
        let style = SpriteStyle {
            scale,
            flip_x: entity.flip_x,
            tint: entity.tint,
        };
        draw_sprite_centered(frame, viewport.width, viewport.height, cx, cy, sprite, style);
        return;
    }

    let half = entity
        .body
        .map(|body| body.half_extents)
        .unwrap_or(Vec2::new(PLACEHOLDER_HALF_SIZE_WORLD, PLACEHOLDER_HALF_SIZE_WORLD));
    let half_w = (half.x * scale).round() as i32;
    let half_h = (half.y * scale).round() as i32;
    draw_filled_rect(
        frame,
        viewport.width,
        viewport.height,
        cx - half_w,
        cy - half_h,
        half_w * 2,
        half_h * 2,
        tint_color(entity.renderable.placeholder_color, entity.tint),
    );
}

fn draw_debug_bodies(frame: &mut [u8], viewport: Viewport, world: &SceneWorld) {
    let camera = world.camera();
    let scale = camera_pixels_per_world(camera);
    let window = (viewport.width, viewport.height);

    if let Some(tilemap) = world.tilemap() {
        if let Some((x_min, x_max, y_min, y_max)) = visible_tiles(camera, viewport, tilemap) {
            let tile_px = (tilemap.tile_size() * scale).round() as i32;
            for y in y_min..=y_max {
                for x in x_min..=x_max {
                    if !tilemap.is_solid(x as i64, y as i64) {
                        continue;
                    }
                    let corner = tilemap.tile_min_world(x as i64, y as i64);
                    let (sx, sy) = world_to_screen_px(camera, window, corner);
                    draw_rect_outline(
                        frame,
                        viewport.width,
                        viewport.height,
                        sx,
                        sy,
                        tile_px,
                        tile_px,
                        DEBUG_SOLID_TILE_COLOR,
                    );
                }
            }
        }
    }

    for entity in world.entities() {
        let Some(body) = entity.body else {
            continue;
        };
        let color = if body.is_massless() {
            DEBUG_MASSLESS_BODY_COLOR
        } else if body.kind == BodyKind::Static {
            DEBUG_STATIC_BODY_COLOR
        } else {
            DEBUG_DYNAMIC_BODY_COLOR
        };
        let (sx, sy) = world_to_screen_px(
            camera,
            window,
            entity.transform.position - body.half_extents,
        );
        draw_rect_outline(
            frame,
            viewport.width,
            viewport.height,
            sx,
            sy,
            (body.half_extents.x * 2.0 * scale).round() as i32,
            (body.half_extents.y * 2.0 * scale).round() as i32,
            color,
        );
    }
}

fn heart_sprite_key(icon: HeartIcon) -> &'static str {
    match icon {
        HeartIcon::Full => "ui/heart-full",
        HeartIcon::Empty => "ui/heart-empty",
    }
}

fn draw_hearts(
    frame: &mut [u8],
    viewport: Viewport,
    hearts: &[HeartIcon],
    sprites: &mut SpriteCache,
    asset_root: &Path,
) {
    let mut cursor_x = HUD_MARGIN_PX;
    for icon in hearts.iter().copied() {
        match sprites.get(asset_root, heart_sprite_key(icon)) {
            Some(sprite) => {
                let w = (sprite.width as f32 * HUD_SCALE) as i32;
                let h = (sprite.height as f32 * HUD_SCALE) as i32;
                let style = SpriteStyle {
                    scale: HUD_SCALE,
                    ..SpriteStyle::default()
                };
                draw_sprite_centered(
                    frame,
                    viewport.width,
                    viewport.height,
                    cursor_x + w / 2,
                    HUD_MARGIN_PX + h / 2,
                    sprite,
                    style,
                );
                cursor_x += w + HUD_MARGIN_PX / 2;
            }
            None => {
                let color = match icon {
                    HeartIcon::Full => HEART_FULL_FALLBACK_COLOR,
                    HeartIcon::Empty => HEART_EMPTY_FALLBACK_COLOR,
                };
                draw_filled_rect(
                    frame,
                    viewport.width,
                    viewport.height,
                    cursor_x,
                    HUD_MARGIN_PX,
                    HEART_FALLBACK_SIZE_PX,
                    HEART_FALLBACK_SIZE_PX,
                    color,
                );
                cursor_x += HEART_FALLBACK_SIZE_PX + HUD_MARGIN_PX / 2;
            }
        }
    }
}
