mod overlay;
mod raster;
mod renderer;
mod transform;

pub(crate) use overlay::OverlayData;
pub use renderer::Renderer;
pub use transform::{screen_to_world_px, world_to_screen_px, Viewport, PIXELS_PER_WORLD};
