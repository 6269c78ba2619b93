use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use engine::{
    load_level_file, resolve_app_paths, AppPaths, LevelError, LoopConfig, Scene, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{DungeonScene, SceneOptions};
use super::settings::{apply_env_overrides, load_settings, Settings, SettingsError};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Level(#[from] LevelError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Dungeon Startup ===");

    let paths = resolve_app_paths()?;
    let settings = apply_env_overrides(load_settings(&paths.settings_file)?, |var| {
        env::var(var).ok()
    })?;
    let level_path = paths.levels_dir.join(&settings.level);
    let level = load_level_file(&level_path)?;
    let seed = settings.seed.unwrap_or_else(clock_seed);
    info!(
        root = %paths.root.display(),
        level = %level_path.display(),
        debug = settings.debug,
        seed,
        "settings_resolved"
    );

    let scene = DungeonScene::new(
        level,
        SceneOptions {
            debug: settings.debug,
            seed,
        },
    );
    Ok(AppWiring {
        config: loop_config(&settings, &paths),
        scene: Box::new(scene),
    })
}

fn loop_config(settings: &Settings, paths: &AppPaths) -> LoopConfig {
    LoopConfig {
        window_width: settings.window_width,
        window_height: settings.window_height,
        debug_overlay: settings.debug,
        asset_root: paths.assets_dir.clone(),
        ..LoopConfig::default()
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .expect("workspace root")
    }

    #[test]
    fn loop_config_follows_settings() {
        let paths = AppPaths {
            root: PathBuf::from("/game"),
            assets_dir: PathBuf::from("/game/assets"),
            levels_dir: PathBuf::from("/game/assets/levels"),
            settings_file: PathBuf::from("/game/assets/settings.json"),
        };
        let settings = Settings {
            debug: true,
            window_width: 640,
            window_height: 480,
            ..Settings::default()
        };

        let config = loop_config(&settings, &paths);

        assert_eq!((config.window_width, config.window_height), (640, 480));
        assert!(config.debug_overlay);
        assert_eq!(config.asset_root, PathBuf::from("/game/assets"));
        assert_eq!(config.target_tps, LoopConfig::default().target_tps);
    }

    #[test]
    fn bundled_settings_and_level_load() {
        let assets = workspace_root().join("assets");
        let settings = load_settings(&assets.join("settings.json")).expect("bundled settings");
        let level =
            load_level_file(&assets.join("levels").join(&settings.level)).expect("bundled level");

        assert!(!level.boxes.is_empty());
        assert!(!level.skeletons.is_empty());
        for content in ["life", "key", "ruby"] {
            assert!(
                level.boxes.iter().any(|placement| placement.content == content),
                "missing {content} box"
            );
        }
    }
}
