//! Error taxonomy for the merge town core.
//!
//! Nothing here is fatal to the game: the composition root logs these and
//! degrades (skips a load, leaves a level under-populated, flashes a
//! rejection cue) instead of propagating them to the player.

use crate::level::BuildingType;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid level index {index} (catalog has {count} levels)")]
    InvalidLevelIndex { index: usize, count: usize },
    #[error("Unknown map: {0}")]
    UnknownMap(String),
    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),
    #[error("Archetype {0} has no collider size")]
    MissingFootprint(String),
    #[error("No valid grid point left for a required {0:?}")]
    PlacementExhausted(BuildingType),
    #[error("No empty slot in the collection bar")]
    NoEmptySlot,
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Catalog parse error: {0}")]
    CatalogParse(String),
    #[error("Config parse error: {0}")]
    ConfigParse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidLevelIndex { index: 9, count: 3 };
        assert_eq!(err.to_string(), "Invalid level index 9 (catalog has 3 levels)");

        let err = CoreError::PlacementExhausted(BuildingType::Cafe);
        assert!(err.to_string().contains("Cafe"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "levels.ron");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
