use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("animation key must not be empty")]
    Empty,
    #[error("animation key must not start with '/'")]
    LeadingSlash,
    #[error("animation key must not contain '..'")]
    ParentTraversal,
    #[error("animation key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Animation keys double as relative sprite paths, so they are restricted to a
/// lowercase path-safe alphabet.
pub(crate) fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(SpriteKeyError::LeadingSlash);
    }
    if key.contains("..") {
        return Err(SpriteKeyError::ParentTraversal);
    }
    match key
        .chars()
        .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-')))
    {
        Some(character) => Err(SpriteKeyError::InvalidCharacter { character }),
        None => Ok(()),
    }
}

pub(crate) fn sprite_path_for_key(asset_root: &Path, key: &str) -> Result<PathBuf, SpriteKeyError> {
    validate_sprite_key(key)?;
    Ok(asset_root.join("sprites").join(format!("{key}.png")))
}
