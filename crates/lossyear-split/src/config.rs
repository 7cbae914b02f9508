//! Configuration for a split run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::overview::DEFAULT_MIN_TILE_SIZE;
use crate::threshold::ThresholdRange;

/// Default number of row workers and concurrent pyramid pipelines.
pub const DEFAULT_WORKERS: usize = 4;

/// Configuration for splitting a lossyear raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// First threshold level (inclusive).
    pub min_level: u8,

    /// Last threshold level (inclusive).
    pub max_level: u8,

    /// Row workers, also the bound on concurrent pyramid pipelines.
    pub workers: usize,

    /// Tile edge length of the containers; overviews stop once a level
    /// fits in a tile.
    pub tile_size: usize,

    /// Directory receiving masks and containers.
    pub output_dir: PathBuf,

    /// Build tile containers after the masks are written.
    pub build_pyramids: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        let thresholds = ThresholdRange::default();
        Self {
            min_level: thresholds.min(),
            max_level: thresholds.max(),
            workers: DEFAULT_WORKERS,
            tile_size: DEFAULT_MIN_TILE_SIZE,
            output_dir: PathBuf::from("."),
            build_pyramids: true,
        }
    }
}

impl SplitConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.min_level == 0 {
            return Err("min_level must be >= 1".to_string());
        }

        if self.max_level < self.min_level {
            return Err(format!(
                "max_level ({}) must be >= min_level ({})",
                self.max_level, self.min_level
            ));
        }

        if self.workers == 0 {
            return Err("workers must be > 0".to_string());
        }

        if self.tile_size == 0 || self.tile_size % 16 != 0 {
            return Err("tile_size must be a positive multiple of 16".to_string());
        }

        Ok(())
    }

    /// The threshold levels to produce.
    pub fn thresholds(&self) -> Result<ThresholdRange> {
        ThresholdRange::new(self.min_level, self.max_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SplitConfig::default();
        assert_eq!(config.min_level, 1);
        assert_eq!(config.max_level, 20);
        assert_eq!(config.workers, 4);
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.build_pyramids);
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds().unwrap().len(), 20);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SplitConfig::default();
        config.min_level = 0;
        assert!(config.validate().is_err());

        config = SplitConfig::default();
        config.min_level = 10;
        config.max_level = 9;
        assert!(config.validate().is_err());
        assert!(config.thresholds().is_err());

        config = SplitConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        config = SplitConfig::default();
        config.tile_size = 100;
        assert!(config.validate().is_err());

        config.tile_size = 512;
        assert!(config.validate().is_ok());
    }
}
