use crate::app::{Camera2D, Vec2};

/// Screen pixels per world pixel at zoom 1.
pub const PIXELS_PER_WORLD: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

pub(crate) fn camera_pixels_per_world(camera: &Camera2D) -> f32 {
    PIXELS_PER_WORLD * camera.effective_zoom()
}

/// World and screen both grow downward; the camera position sits at the viewport centre.
pub fn world_to_screen_px(camera: &Camera2D, window_size: (u32, u32), world: Vec2) -> (i32, i32) {
    let scale = camera_pixels_per_world(camera);
    let x = (world.x - camera.position.x) * scale + window_size.0 as f32 * 0.5;
    let y = (world.y - camera.position.y) * scale + window_size.1 as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}

pub fn screen_to_world_px(camera: &Camera2D, window_size: (u32, u32), screen_px: Vec2) -> Vec2 {
    let scale = camera_pixels_per_world(camera);
    Vec2::new(
        (screen_px.x - window_size.0 as f32 * 0.5) / scale + camera.position.x,
        (screen_px.y - window_size.1 as f32 * 0.5) / scale + camera.position.y,
    )
}
