//! Georeferencing fixtures modelled on Hansen Global Forest Change tiles.
//!
//! Hansen tiles are 10x10 degree, 40000x40000 pixel WGS84 rasters named
//! after their top-left corner (e.g. `10N_080W`).

use geotiff::{GeoKeys, GeoReference, GeoTransform};

/// Pixels along each edge of a full Hansen tile.
pub const HANSEN_TILE_PIXELS: usize = 40_000;

/// Pixel size of a Hansen tile in degrees.
pub const HANSEN_PIXEL_SIZE: f64 = 0.00025;

/// WGS84 geographic GeoKey directory as written by GDAL.
pub fn wgs84_keys() -> GeoKeys {
    GeoKeys {
        directory: vec![
            1, 1, 0, 4, //
            1024, 0, 1, 2, // GTModelType: geographic
            1025, 0, 1, 1, // GTRasterType: pixel is area
            2048, 0, 1, 4326, // GeographicType: WGS84
            2054, 0, 1, 9102, // GeogAngularUnits: degree
        ],
        double_params: vec![],
        ascii_params: "WGS 84|".to_string(),
    }
}

/// North-up transform for a Hansen tile with its top-left corner at
/// (`lon`, `lat`) whole degrees.
pub fn hansen_transform(lon: i32, lat: i32) -> GeoTransform {
    GeoTransform::north_up(lon as f64, lat as f64, HANSEN_PIXEL_SIZE)
}

/// Full georeference for a Hansen tile.
pub fn hansen_georef(lon: i32, lat: i32) -> GeoReference {
    GeoReference::new(hansen_transform(lon, lat), wgs84_keys())
}

/// Tile names paired with their top-left corner and the stem suffix the
/// splitter derives from it.
pub mod tiles {
    /// 10N_080W: Central America.
    pub const TILE_10N_080W: (i32, i32, &str) = (-80, 10, "10_280");

    /// 00N_010E: Gabon, origin on the equator.
    pub const TILE_00N_010E: (i32, i32, &str) = (10, 0, "0_10");

    /// 10S_060W: Amazon basin, negative latitude.
    pub const TILE_10S_060W: (i32, i32, &str) = (-60, -10, "350_300");

    /// 80N_180W: the westernmost column wraps to 180.
    pub const TILE_80N_180W: (i32, i32, &str) = (-180, 80, "80_180");
}
