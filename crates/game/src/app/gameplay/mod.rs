mod door;
mod encounter;
mod events;
mod hud;
mod loot_box;
mod player;
mod scene;
mod skeleton;
mod world_object;

pub(crate) use scene::{DungeonScene, SceneOptions};
