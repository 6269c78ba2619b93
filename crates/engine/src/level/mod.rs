mod loader;

use std::fmt;
use std::path::PathBuf;

use crate::app::{Tilemap, Vec2};

pub use loader::{load_level_file, parse_level_str};

/// Spawn position used when the level has no `Player` object group.
pub const DEFAULT_PLAYER_SPAWN: Vec2 = Vec2::new(32.0, 32.0);

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlacement {
    pub position: Vec2,
    /// Content label taken from the object name, e.g. `life`, `key`, `ruby`.
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonPlacement {
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorPlacement {
    pub position: Vec2,
}

/// Everything a dungeon scene needs from one parsed level file.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelData {
    pub tilemap: Tilemap,
    pub player_spawn: Vec2,
    pub boxes: Vec<BoxPlacement>,
    pub skeletons: Vec<SkeletonPlacement>,
    pub door: DoorPlacement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    MissingLayer,
    MissingObject,
    MissingAttribute,
    InvalidValue,
    TileCountMismatch,
}

#[derive(Debug, Clone)]
pub struct LevelError {
    pub code: LevelErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for LevelError {}
