mod input;
mod loop_runner;
mod metrics;
mod physics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use physics::{Body, BodyKind, Contact, PhysicsReport};
pub use rendering::{
    screen_to_world_px, world_to_screen_px, Renderer, Viewport, PIXELS_PER_WORLD,
};
pub use scene::{
    Camera2D, Entity, EntityId, HeartIcon, HudBanner, HudView, InputSnapshot, RenderableDesc,
    RenderableKind, Scene, SceneCommand, SceneWorld, Tilemap, TilemapError, Transform, Vec2,
    TILE_EMPTY, TILE_FLOOR, TILE_WALL,
};
pub(crate) use rendering::OverlayData;
