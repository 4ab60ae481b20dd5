use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors from loading or validating an [`IndexConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tile size must be finite and positive, got {0}")]
    InvalidTileSize(f64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Index configuration: grid resolution and per-partition sizing.
///
/// Missing fields in a JSON document fall back to [`IndexConfig::default`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Edge length of a square cell on the (x, z) plane, in world units.
    pub tile_size: f64,
    /// Initial capacity of each partition's entity list.
    pub partition_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            tile_size: 64.0,
            partition_capacity: 1,
        }
    }
}

impl IndexConfig {
    /// Default configuration with a specific tile size.
    pub fn with_tile_size(tile_size: f64) -> Self {
        Self {
            tile_size,
            ..Self::default()
        }
    }

    /// Check that the configuration describes a usable grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tile_size.is_finite() || self.tile_size <= 0.0 {
            return Err(ConfigError::InvalidTileSize(self.tile_size));
        }
        Ok(())
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_config_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.tile_size, 64.0);
        assert_eq!(config.partition_capacity, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_tile_sizes() {
        for tile_size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = IndexConfig::with_tile_size(tile_size).validate();
            assert!(matches!(err, Err(ConfigError::InvalidTileSize(_))));
        }
    }

    #[test]
    fn json_missing_fields_use_defaults() {
        let config = IndexConfig::from_json_str(r#"{ "tile_size": 200.0 }"#).unwrap();
        assert_eq!(config.tile_size, 200.0);
        assert_eq!(config.partition_capacity, 1);
    }

    #[test]
    fn json_with_bad_tile_size_fails_validation() {
        let err = IndexConfig::from_json_str(r#"{ "tile_size": 0.0 }"#);
        assert!(matches!(err, Err(ConfigError::InvalidTileSize(_))));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = IndexConfig::from_json_str("{ tile_size: ");
        assert!(matches!(err, Err(ConfigError::Json(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, r#"{ "tile_size": 50.0, "partition_capacity": 8 }"#).unwrap();

        let config = IndexConfig::load(&path).unwrap();
        assert_eq!(config, IndexConfig {
            tile_size: 50.0,
            partition_capacity: 8,
        });
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IndexConfig::load(dir.path().join("absent.json"));
        assert!(matches!(err, Err(ConfigError::Io(_))));
    }
}
