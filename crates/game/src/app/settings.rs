use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub(crate) const DEBUG_ENV_VAR: &str = "DUNGEON_DEBUG";
pub(crate) const SEED_ENV_VAR: &str = "DUNGEON_SEED";

const DEFAULT_LEVEL: &str = "dungeon.tmx";
const DEFAULT_WINDOW_WIDTH: u32 = 960;
const DEFAULT_WINDOW_HEIGHT: u32 = 720;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) debug: bool,
    /// File name under `assets/levels`.
    pub(crate) level: String,
    /// Fixed seed for skeleton rerolls; the clock seeds when absent.
    pub(crate) seed: Option<u64>,
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            level: DEFAULT_LEVEL.to_string(),
            seed: None,
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings in {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid settings in {path}: {field} {message}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        message: &'static str,
    },
    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

/// Reads settings from `path`; a missing file means defaults.
pub(crate) fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_settings(path, &raw)
}

pub(crate) fn parse_settings(path: &Path, raw: &str) -> Result<Settings, SettingsError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let settings: Settings =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let field = error.path().to_string();
            let source = error.into_inner();
            let message = if field.is_empty() || field == "." {
                source.to_string()
            } else {
                format!("at {field}: {source}")
            };
            SettingsError::Parse {
                path: path.to_path_buf(),
                message,
            }
        })?;
    validate(path, &settings)?;
    Ok(settings)
}

fn validate(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let invalid = |field, message| SettingsError::Invalid {
        path: path.to_path_buf(),
        field,
        message,
    };
    if settings.level.trim().is_empty() {
        return Err(invalid("level", "must name a level file"));
    }
    if settings.window_width == 0 {
        return Err(invalid("window_width", "must be positive"));
    }
    if settings.window_height == 0 {
        return Err(invalid("window_height", "must be positive"));
    }
    Ok(())
}

/// Applies `DUNGEON_DEBUG` and `DUNGEON_SEED` on top of file settings.
pub(crate) fn apply_env_overrides(
    mut settings: Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Settings, SettingsError> {
    if let Some(raw) = lookup(DEBUG_ENV_VAR) {
        settings.debug = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            _ => {
                return Err(SettingsError::Env {
                    var: DEBUG_ENV_VAR,
                    value: raw,
                })
            }
        };
    }
    if let Some(raw) = lookup(SEED_ENV_VAR) {
        let seed = raw.trim().parse::<u64>().map_err(|_| SettingsError::Env {
            var: SEED_ENV_VAR,
            value: raw.clone(),
        })?;
        settings.seed = Some(seed);
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Result<Settings, SettingsError> {
        parse_settings(Path::new("assets/settings.json"), &value.to_string())
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        }
    }

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(parse(json!({})).expect("settings"), Settings::default());
    }

    #[test]
    fn fields_override_defaults() {
        let settings = parse(json!({
            "debug": true,
            "level": "crypt.tmx",
            "seed": 99,
            "window_width": 640
        }))
        .expect("settings");
        assert!(settings.debug);
        assert_eq!(settings.level, "crypt.tmx");
        assert_eq!(settings.seed, Some(99));
        assert_eq!(settings.window_width, 640);
        assert_eq!(settings.window_height, DEFAULT_WINDOW_HEIGHT);
    }

    #[test]
    fn type_errors_name_the_field() {
        let error = parse(json!({ "seed": "forty-two" })).expect_err("bad seed");
        let message = error.to_string();
        assert!(message.contains("seed"), "{message}");
        assert!(message.contains("assets/settings.json"), "{message}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = parse(json!({ "fullscreen": true })).expect_err("unknown field");
        assert!(matches!(error, SettingsError::Parse { .. }));
    }

    #[test]
    fn zero_window_size_is_invalid() {
        let error = parse(json!({ "window_height": 0 })).expect_err("zero height");
        assert!(matches!(
            error,
            SettingsError::Invalid {
                field: "window_height",
                ..
            }
        ));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = load_settings(&dir.path().join("settings.json")).expect("defaults");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_on_disk_is_parsed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, json!({ "debug": true }).to_string()).expect("write settings");
        assert!(load_settings(&path).expect("settings").debug);
    }

    #[test]
    fn env_overrides_debug_and_seed() {
        let settings = apply_env_overrides(
            Settings::default(),
            env(&[(DEBUG_ENV_VAR, "TRUE"), (SEED_ENV_VAR, " 12 ")]),
        )
        .expect("overrides");
        assert!(settings.debug);
        assert_eq!(settings.seed, Some(12));

        let untouched = apply_env_overrides(Settings::default(), env(&[])).expect("no overrides");
        assert_eq!(untouched, Settings::default());
    }

    #[test]
    fn bad_env_values_are_errors() {
        let error = apply_env_overrides(Settings::default(), env(&[(SEED_ENV_VAR, "-1")]))
            .expect_err("negative seed");
        assert!(matches!(error, SettingsError::Env { var: SEED_ENV_VAR, .. }));

        let error = apply_env_overrides(Settings::default(), env(&[(DEBUG_ENV_VAR, "maybe")]))
            .expect_err("bad flag");
        assert!(matches!(error, SettingsError::Env { var: DEBUG_ENV_VAR, .. }));
    }
}
