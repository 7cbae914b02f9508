//! Output file naming.
//!
//! Names follow the Hansen GFC tile convention so downstream consumers can
//! match masks to source tiles:
//!
//! ```text
//! accumulative_lossyear_to_2005_10_20.tiff
//!                          ^^^^ ^^ ^^
//!                          |    |  longitude of the origin, in [0, 360)
//!                          |    latitude of the origin, in [0, 360)
//!                          "2" + level zero-padded to three digits
//! ```

use std::path::{Path, PathBuf};

use geotiff::GeoTransform;

/// Extension of the per-level mask rasters.
pub const MASK_EXTENSION: &str = "tiff";
/// Extension of the tiled pyramid containers.
pub const CONTAINER_EXTENSION: &str = "ptif";

const STEM_PREFIX: &str = "accumulative_lossyear_to_2";

/// Truncate a coordinate to whole degrees and wrap it into `[0, 360)`.
pub fn normalize_degrees(value: f64) -> i64 {
    (value as i64 + 360).rem_euclid(360)
}

/// File stem shared by a level's mask and container.
pub fn file_stem(level: u8, transform: &GeoTransform) -> String {
    let lat = normalize_degrees(transform.origin_y());
    let long = normalize_degrees(transform.origin_x());
    format!("{}{:03}_{}_{}", STEM_PREFIX, level, lat, long)
}

/// Path of the mask raster for `level` inside `dir`.
pub fn mask_path(dir: &Path, level: u8, transform: &GeoTransform) -> PathBuf {
    dir.join(format!("{}.{}", file_stem(level, transform), MASK_EXTENSION))
}

/// Path of the tile container for a mask raster.
pub fn container_path(mask: &Path) -> PathBuf {
    mask.with_extension(CONTAINER_EXTENSION)
}
