use super::scene::{Entity, EntityId, Tilemap, Vec2};

/// Bodies closer than this still count as touching.
const CONTACT_SLOP: f32 = 0.05;
/// Gap left between a body and the wall it was pushed out of.
const TILE_SKIN: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Static,
}

/// Axis-aligned box collider centred on the entity position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub kind: BodyKind,
    pub half_extents: Vec2,
    /// World pixels per second.
    pub velocity: Vec2,
    /// Zero mass keeps reporting overlaps but takes no part in separation.
    pub mass: f32,
    pub collides_with_tiles: bool,
}

impl Body {
    pub fn dynamic(half_extents: Vec2) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            half_extents,
            velocity: Vec2::ZERO,
            mass: 1.0,
            collides_with_tiles: true,
        }
    }

    pub fn fixed(half_extents: Vec2) -> Self {
        Self {
            kind: BodyKind::Static,
            half_extents,
            velocity: Vec2::ZERO,
            mass: 1.0,
            collides_with_tiles: false,
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_tile_collision(mut self, enabled: bool) -> Self {
        self.collides_with_tiles = enabled;
        self
    }

    pub fn is_massless(&self) -> bool {
        self.mass.is_nan() || self.mass <= 0.0
    }
}

/// Unordered pair of entities whose bodies overlapped this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
}

impl Contact {
    pub fn involves(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }

    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsReport {
    /// Body pairs, sorted by entity id.
    pub contacts: Vec<Contact>,
    /// Entities pushed back out of a solid tile, at most once per step.
    pub tile_contacts: Vec<EntityId>,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

struct Overlap {
    depth: Vec2,
    sign: Vec2,
}

pub(crate) fn step(
    entities: &mut [Entity],
    tilemap: Option<&Tilemap>,
    dt_seconds: f32,
) -> PhysicsReport {
    let mut report = PhysicsReport::default();
    if !dt_seconds.is_finite() || dt_seconds < 0.0 {
        return report;
    }

    for entity in entities.iter_mut() {
        let Some(body) = entity.body else {
            continue;
        };
        if body.kind != BodyKind::Dynamic {
            continue;
        }
        let mut blocked = false;
        for axis in [Axis::X, Axis::Y] {
            let delta = axis_component(body.velocity, axis) * dt_seconds;
            if delta == 0.0 || !delta.is_finite() {
                continue;
            }
            *axis_component_mut(&mut entity.transform.position, axis) += delta;
            if let (true, Some(map)) = (body.collides_with_tiles, tilemap) {
                blocked |= push_out_of_tiles(
                    map,
                    &mut entity.transform.position,
                    body.half_extents,
                    axis,
                    delta,
                );
            }
        }
        if blocked {
            report.tile_contacts.push(entity.id);
        }
    }

    for j in 1..entities.len() {
        let (head, tail) = entities.split_at_mut(j);
        let second = &mut tail[0];
        for first in head.iter_mut() {
            let (Some(body_a), Some(body_b)) = (first.body, second.body) else {
                continue;
            };
            if body_a.kind == BodyKind::Static && body_b.kind == BodyKind::Static {
                continue;
            }
            let Some(overlap) = aabb_overlap(
                first.transform.position,
                body_a.half_extents,
                second.transform.position,
                body_b.half_extents,
            ) else {
                continue;
            };
            report.contacts.push(Contact {
                a: first.id,
                b: second.id,
            });
            if body_a.is_massless() || body_b.is_massless() {
                continue;
            }
            separate(first, body_a, second, body_b, overlap);
        }
    }

    report
        .contacts
        .sort_by_key(|contact| (contact.a.min(contact.b), contact.a.max(contact.b)));
    report
}

fn axis_component(value: Vec2, axis: Axis) -> f32 {
    match axis {
        Axis::X => value.x,
        Axis::Y => value.y,
    }
}

fn axis_component_mut(value: &mut Vec2, axis: Axis) -> &mut f32 {
    match axis {
        Axis::X => &mut value.x,
        Axis::Y => &mut value.y,
    }
}

/// Moves the body back against every solid tile it now overlaps on `axis`.
fn push_out_of_tiles(
    tilemap: &Tilemap,
    position: &mut Vec2,
    half_extents: Vec2,
    axis: Axis,
    delta: f32,
) -> bool {
    let (x_min, x_max, y_min, y_max) =
        tilemap.tile_span(*position - half_extents, *position + half_extents);
    let tile_size = tilemap.tile_size();
    let mut blocked = false;

    for ty in y_min..=y_max {
        for tx in x_min..=x_max {
            if !tilemap.is_solid(tx, ty) {
                continue;
            }
            let tile_min = tilemap.tile_min_world(tx, ty);
            let tile_max = tile_min + Vec2::new(tile_size, tile_size);
            let body_min = *position - half_extents;
            let body_max = *position + half_extents;
            let overlapping = body_min.x < tile_max.x
                && body_max.x > tile_min.x
                && body_min.y < tile_max.y
                && body_max.y > tile_min.y;
            if !overlapping {
                continue;
            }
            let half = axis_component(half_extents, axis);
            let coordinate = axis_component_mut(position, axis);
            *coordinate = if delta > 0.0 {
                axis_component(tile_min, axis) - half - TILE_SKIN
            } else {
                axis_component(tile_max, axis) + half + TILE_SKIN
            };
            blocked = true;
        }
    }

    blocked
}

fn aabb_overlap(a_pos: Vec2, a_half: Vec2, b_pos: Vec2, b_half: Vec2) -> Option<Overlap> {
    let offset = b_pos - a_pos;
    let depth = Vec2::new(
        a_half.x + b_half.x - offset.x.abs(),
        a_half.y + b_half.y - offset.y.abs(),
    );
    if depth.x < -CONTACT_SLOP || depth.y < -CONTACT_SLOP {
        return None;
    }
    let sign = Vec2::new(
        if offset.x < 0.0 { -1.0 } else { 1.0 },
        if offset.y < 0.0 { -1.0 } else { 1.0 },
    );
    Some(Overlap { depth, sign })
}

/// Splits the penetration along the shallower axis by inverse mass. Static bodies never move.
fn separate(a: &mut Entity, body_a: Body, b: &mut Entity, body_b: Body, overlap: Overlap) {
    if overlap.depth.x <= 0.0 || overlap.depth.y <= 0.0 {
        return;
    }
    let (share_a, share_b) = match (body_a.kind, body_b.kind) {
        (BodyKind::Dynamic, BodyKind::Static) => (1.0, 0.0),
        (BodyKind::Static, BodyKind::Dynamic) => (0.0, 1.0),
        _ => {
            let inverse_a = body_a.mass.recip();
            let inverse_b = body_b.mass.recip();
            let total = inverse_a + inverse_b;
            (inverse_a / total, inverse_b / total)
        }
    };

    if overlap.depth.x < overlap.depth.y {
        a.transform.position.x -= overlap.sign.x * overlap.depth.x * share_a;
        b.transform.position.x += overlap.sign.x * overlap.depth.x * share_b;
    } else {
        a.transform.position.y -= overlap.sign.y * overlap.depth.y * share_a;
        b.transform.position.y += overlap.sign.y * overlap.depth.y * share_b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scene::{RenderableDesc, SceneWorld, Transform, TILE_FLOOR, TILE_WALL};

    fn spawn_body(world: &mut SceneWorld, position: Vec2, body: Body) -> EntityId {
        world.spawn_with_body(
            Transform { position },
            RenderableDesc::sprite("test", "test", [255, 255, 255, 255]),
            body,
        )
    }

    fn corridor() -> Tilemap {
        // 4x1: floor floor floor wall
        Tilemap::new(
            4,
            1,
            16.0,
            Vec2::ZERO,
            vec![TILE_FLOOR, TILE_FLOOR, TILE_FLOOR, TILE_WALL],
            vec![false, false, false, true],
        )
        .expect("tilemap")
    }

    #[test]
    fn dynamic_body_integrates_velocity() {
        let mut world = SceneWorld::default();
        let mut body = Body::dynamic(Vec2::new(4.0, 4.0));
        body.velocity = Vec2::new(60.0, -30.0);
        let id = spawn_body(&mut world, Vec2::new(100.0, 100.0), body);
        world.apply_pending();

        let report = world.step_physics(0.5);

        let entity = world.find_entity(id).expect("entity");
        assert_eq!(entity.transform.position, Vec2::new(130.0, 85.0));
        assert!(report.contacts.is_empty());
        assert!(report.tile_contacts.is_empty());
    }

    #[test]
    fn solid_tile_blocks_and_reports_once() {
        let mut world = SceneWorld::default();
        world.set_tilemap(corridor());
        let mut body = Body::dynamic(Vec2::new(4.0, 4.0));
        body.velocity = Vec2::new(100.0, 0.0);
        let id = spawn_body(&mut world, Vec2::new(40.0, 8.0), body);
        world.apply_pending();

        let report = world.step_physics(0.1);

        let entity = world.find_entity(id).expect("entity");
        assert!(entity.transform.position.x <= 48.0 - 4.0);
        assert_eq!(report.tile_contacts, vec![id]);
    }

    #[test]
    fn tile_collision_can_be_disabled() {
        let mut world = SceneWorld::default();
        world.set_tilemap(corridor());
        let mut body = Body::dynamic(Vec2::new(4.0, 4.0)).with_tile_collision(false);
        body.velocity = Vec2::new(100.0, 0.0);
        let id = spawn_body(&mut world, Vec2::new(40.0, 8.0), body);
        world.apply_pending();

        let report = world.step_physics(0.1);

        assert!(report.tile_contacts.is_empty());
        let entity = world.find_entity(id).expect("entity");
        assert!((entity.transform.position.x - 50.0).abs() < 0.0001);
    }

    #[test]
    fn overlapping_dynamic_bodies_split_separation() {
        let mut world = SceneWorld::default();
        let left = spawn_body(&mut world, Vec2::new(0.0, 0.0), Body::dynamic(Vec2::new(5.0, 5.0)));
        let right = spawn_body(&mut world, Vec2::new(8.0, 0.0), Body::dynamic(Vec2::new(5.0, 5.0)));
        world.apply_pending();

        let report = world.step_physics(1.0 / 60.0);

        assert_eq!(report.contacts, vec![Contact { a: left, b: right }]);
        let left_x = world.find_entity(left).expect("left").transform.position.x;
        let right_x = world.find_entity(right).expect("right").transform.position.x;
        assert!((left_x + 1.0).abs() < 0.0001);
        assert!((right_x - 9.0).abs() < 0.0001);
    }

    #[test]
    fn static_body_is_immovable() {
        let mut world = SceneWorld::default();
        let wall = spawn_body(&mut world, Vec2::new(0.0, 0.0), Body::fixed(Vec2::new(5.0, 5.0)));
        let mover = spawn_body(&mut world, Vec2::new(0.0, 6.0), Body::dynamic(Vec2::new(5.0, 5.0)));
        world.apply_pending();

        world.step_physics(1.0 / 60.0);

        assert_eq!(
            world.find_entity(wall).expect("wall").transform.position,
            Vec2::ZERO
        );
        let mover_y = world.find_entity(mover).expect("mover").transform.position.y;
        assert!((mover_y - 10.0).abs() < 0.0001);
    }

    #[test]
    fn massless_body_reports_contact_without_pushing() {
        let mut world = SceneWorld::default();
        let ghost = spawn_body(
            &mut world,
            Vec2::new(0.0, 0.0),
            Body::dynamic(Vec2::new(5.0, 5.0)).with_mass(0.0),
        );
        let other = spawn_body(&mut world, Vec2::new(2.0, 0.0), Body::dynamic(Vec2::new(5.0, 5.0)));
        world.apply_pending();

        let report = world.step_physics(1.0 / 60.0);

        assert_eq!(report.contacts.len(), 1);
        assert!(report.contacts[0].involves(ghost));
        assert_eq!(report.contacts[0].other(ghost), Some(other));
        assert_eq!(
            world.find_entity(other).expect("other").transform.position,
            Vec2::new(2.0, 0.0)
        );
    }

    #[test]
    fn touching_bodies_within_slop_still_report() {
        let mut world = SceneWorld::default();
        spawn_body(&mut world, Vec2::new(0.0, 0.0), Body::fixed(Vec2::new(5.0, 5.0)));
        spawn_body(&mut world, Vec2::new(10.02, 0.0), Body::dynamic(Vec2::new(5.0, 5.0)));
        world.apply_pending();

        let report = world.step_physics(1.0 / 60.0);
        assert_eq!(report.contacts.len(), 1);
    }

    #[test]
    fn static_pairs_are_skipped() {
        let mut world = SceneWorld::default();
        spawn_body(&mut world, Vec2::ZERO, Body::fixed(Vec2::new(5.0, 5.0)));
        spawn_body(&mut world, Vec2::ZERO, Body::fixed(Vec2::new(5.0, 5.0)));
        world.apply_pending();

        assert!(world.step_physics(1.0 / 60.0).contacts.is_empty());
    }
}
