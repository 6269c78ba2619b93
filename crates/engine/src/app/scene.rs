use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use thiserror::Error;

use super::input::{ActionStates, InputAction};
use super::physics::{self, Body, PhysicsReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    HardReset,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    interact_pressed: bool,
    attack_pressed: bool,
    restart_pressed: bool,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        interact_pressed: bool,
        attack_pressed: bool,
        restart_pressed: bool,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            interact_pressed,
            attack_pressed,
            restart_pressed,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    pub fn with_attack_pressed(mut self, attack_pressed: bool) -> Self {
        self.attack_pressed = attack_pressed;
        self
    }

    pub fn with_restart_pressed(mut self, restart_pressed: bool) -> Self {
        self.restart_pressed = restart_pressed;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    /// Interact key (Space) went down this tick.
    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    /// Primary pointer button went down this tick.
    pub fn attack_pressed(&self) -> bool {
        self.attack_pressed
    }

    pub fn restart_pressed(&self) -> bool {
        self.restart_pressed
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction; degenerate input yields zero.
    pub fn normalized(self) -> Self {
        let length = self.length();
        if !length.is_finite() || length <= f32::EPSILON {
            return Self::ZERO;
        }
        Self::new(self.x / length, self.y / length)
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    pub fn lerp(self, target: Vec2, alpha: f32) -> Self {
        self + (target - self).scaled(alpha)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        self.scaled(rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;
pub const CAMERA_ZOOM_MIN: f32 = 1.0;
pub const CAMERA_ZOOM_MAX: f32 = 8.0;

#[derive(Debug, Clone, Copy)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            zoom: CAMERA_ZOOM_DEFAULT,
        }
    }
}

impl Camera2D {
    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32) {
        self.zoom = clamp_camera_zoom(zoom);
    }

    pub fn follow(&mut self, target: Vec2, lerp: f32) {
        self.position = self.position.lerp(target, lerp.clamp(0.0, 1.0));
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Transform {
    pub position: Vec2,
}

pub const TILE_EMPTY: u16 = 0;
pub const TILE_FLOOR: u16 = 1;
pub const TILE_WALL: u16 = 2;

/// Tilemap origin convention:
/// - world y grows downward.
/// - `origin` is the world position of the top-left corner of tile (0,0).
/// - tile (x,y) covers `origin + (x, y) * tile_size` to `origin + (x + 1, y + 1) * tile_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tile_size: f32,
    origin: Vec2,
    tiles: Vec<u16>,
    solid: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("solid flag count mismatch: expected {expected}, got {actual}")]
    SolidCountMismatch { expected: usize, actual: usize },
    #[error("tile size must be positive and finite, got {0}")]
    InvalidTileSize(f32),
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        tile_size: f32,
        origin: Vec2,
        tiles: Vec<u16>,
        solid: Vec<bool>,
    ) -> Result<Self, TilemapError> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(TilemapError::InvalidTileSize(tile_size));
        }
        let expected = width as usize * height as usize;
        if tiles.len() != expected {
            return Err(TilemapError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        if solid.len() != expected {
            return Err(TilemapError::SolidCountMismatch {
                expected,
                actual: solid.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tile_size,
            origin,
            tiles,
            solid,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u16> {
        self.index_of(x, y).map(|index| self.tiles[index])
    }

    /// Out-of-range cells are never solid.
    pub fn is_solid(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return false;
        };
        self.index_of(x, y)
            .map(|index| self.solid[index])
            .unwrap_or(false)
    }

    pub fn tile_min_world(&self, x: i64, y: i64) -> Vec2 {
        Vec2::new(
            self.origin.x + x as f32 * self.tile_size,
            self.origin.y + y as f32 * self.tile_size,
        )
    }

    pub fn tile_center_world(&self, x: u32, y: u32) -> Option<Vec2> {
        self.index_of(x, y)?;
        let half = self.tile_size * 0.5;
        Some(self.tile_min_world(x as i64, y as i64) + Vec2::new(half, half))
    }

    /// Inclusive tile index range touched by a world-space box.
    pub fn tile_span(&self, min: Vec2, max: Vec2) -> (i64, i64, i64, i64) {
        let to_index = |value: f32, origin: f32| ((value - origin) / self.tile_size).floor() as i64;
        let x_min = to_index(min.x, self.origin.x);
        let y_min = to_index(min.y, self.origin.y);
        let x_max = ((max.x - self.origin.x) / self.tile_size).ceil() as i64 - 1;
        let y_max = ((max.y - self.origin.y) / self.tile_size).ceil() as i64 - 1;
        (x_min, x_max, y_min, y_max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderableKind {
    Placeholder,
    /// Animation key, resolved to `sprites/<key>.png`.
    Sprite(String),
}

#[derive(Debug, Clone)]
pub struct RenderableDesc {
    pub kind: RenderableKind,
    pub debug_name: &'static str,
    pub placeholder_color: [u8; 4],
}

impl RenderableDesc {
    pub fn sprite(key: impl Into<String>, debug_name: &'static str, color: [u8; 4]) -> Self {
        Self {
            kind: RenderableKind::Sprite(key.into()),
            debug_name,
            placeholder_color: color,
        }
    }

    pub fn sprite_key(&self) -> Option<&str> {
        match &self.kind {
            RenderableKind::Sprite(key) => Some(key.as_str()),
            RenderableKind::Placeholder => None,
        }
    }

    pub fn set_sprite_key(&mut self, key: &str) {
        if self.sprite_key() != Some(key) {
            self.kind = RenderableKind::Sprite(key.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartIcon {
    Full,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudBanner {
    pub title: String,
    pub subtitle: String,
}

/// Screen-space overlay a scene asks the renderer to draw on top of the world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudView {
    pub hearts: Vec<HeartIcon>,
    pub banner: Option<HudBanner>,
    pub debug_lines: Vec<String>,
    pub show_bodies: bool,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub renderable: RenderableDesc,
    pub body: Option<Body>,
    pub flip_x: bool,
    pub tint: Option<[u8; 4]>,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn applied_spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    next_applied_spawn_order: u64,
    camera: Camera2D,
    tilemap: Option<Tilemap>,
}

impl SceneWorld {
    pub fn spawn(&mut self, transform: Transform, renderable: RenderableDesc) -> EntityId {
        self.spawn_internal(transform, renderable, None)
    }

    pub fn spawn_with_body(
        &mut self,
        transform: Transform,
        renderable: RenderableDesc,
        body: Body,
    ) -> EntityId {
        self.spawn_internal(transform, renderable, Some(body))
    }

    fn spawn_internal(
        &mut self,
        transform: Transform,
        renderable: RenderableDesc,
        body: Option<Body>,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            transform,
            renderable,
            body,
            flip_x: false,
            tint: None,
            applied_spawn_order: 0,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_spawns
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_despawns.clear();
        }

        for mut entity in self.pending_spawns.drain(..) {
            entity.applied_spawn_order = self.next_applied_spawn_order;
            self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
            self.entities.push(entity);
        }
    }

    /// Drops every entity and resets the camera. The tilemap survives.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
        self.camera = Camera2D::default();
    }

    pub fn set_tilemap(&mut self, tilemap: Tilemap) {
        self.tilemap = Some(tilemap);
    }

    pub fn clear_tilemap(&mut self) {
        self.tilemap = None;
    }

    pub fn tilemap(&self) -> Option<&Tilemap> {
        self.tilemap.as_ref()
    }

    /// Integrates bodies for one fixed step and reports what touched what.
    pub fn step_physics(&mut self, dt_seconds: f32) -> PhysicsReport {
        physics::step(&mut self.entities, self.tilemap.as_ref(), dt_seconds)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn hud(&self, _world: &SceneWorld) -> Option<HudView> {
        None
    }
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

pub(crate) struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRuntime {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        self.scene.update(fixed_dt_seconds, input, &mut self.world)
    }

    pub(crate) fn apply_pending(&mut self) {
        self.world.apply_pending();
    }

    pub(crate) fn hard_reset(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
        }
        self.world.clear();
        self.world.clear_tilemap();
        self.scene.load(&mut self.world);
        self.is_loaded = true;
        self.world.apply_pending();
    }

    pub(crate) fn shutdown(&mut self) {
        if !self.is_loaded {
            return;
        }
        self.scene.unload(&mut self.world);
        self.world.clear();
        self.is_loaded = false;
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn hud(&self) -> Option<HudView> {
        self.scene.hud(&self.world)
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }
}
