use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod level;
mod sprite_keys;

pub use app::{
    run_app, run_app_with_metrics, screen_to_world_px, world_to_screen_px, AppError, Body,
    BodyKind, Camera2D, Contact, Entity, EntityId, HeartIcon, HudBanner, HudView, InputAction,
    InputSnapshot, LoopConfig, LoopMetricsSnapshot, MetricsHandle, PhysicsReport, RenderableDesc,
    RenderableKind, Renderer, Scene, SceneCommand, SceneWorld, Tilemap, TilemapError, Transform,
    Vec2, Viewport, PIXELS_PER_WORLD, SLOW_FRAME_ENV_VAR, TILE_EMPTY, TILE_FLOOR, TILE_WALL,
};
pub use level::{
    load_level_file, parse_level_str, BoxPlacement, DoorPlacement, LevelData, LevelError,
    LevelErrorCode, SkeletonPlacement, SourceLocation, DEFAULT_PLAYER_SPAWN,
};
pub use sprite_keys::SpriteKeyError;

pub const ROOT_ENV_VAR: &str = "DUNGEON_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub levels_dir: PathBuf,
    pub settings_file: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "DUNGEON_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain an assets/ directory."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not find the project root by walking upward from: {start_dir}\n\
Expected a directory containing assets/levels/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/dungeon\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_for_root(root))
}

fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let assets_dir = root.join("assets");
    AppPaths {
        levels_dir: assets_dir.join("levels"),
        settings_file: assets_dir.join("settings.json"),
        assets_dir,
        root,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if normalized.join("assets").is_dir() {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_root_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_root_marker(path: &Path) -> bool {
    path.join("assets").join("levels").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
