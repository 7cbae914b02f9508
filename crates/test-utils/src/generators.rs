//! Synthetic lossyear rasters.
//!
//! Values are predictable so tests can recompute the expected mask for any
//! pixel without reading the source back.

use std::path::Path;

use geotiff::{GeoReference, GeoTiffWriter};

/// Lossyear value at (`x`, `y`): cycles through `0..=max_year` along
/// diagonals, so every level appears in every row once the raster is wider
/// than `max_year`.
///
/// ```
/// use test_utils::lossyear_value;
///
/// assert_eq!(lossyear_value(0, 0, 20), 0);
/// assert_eq!(lossyear_value(3, 1, 20), 4);
/// assert_eq!(lossyear_value(21, 0, 20), 0);
/// ```
pub fn lossyear_value(x: usize, y: usize, max_year: u8) -> u8 {
    ((x + y) % (max_year as usize + 1)) as u8
}

/// Row-major lossyear grid built from [`lossyear_value`].
pub fn create_lossyear_grid(width: usize, height: usize, max_year: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            data.push(lossyear_value(x, y, max_year));
        }
    }
    data
}

/// Reference mask computed pixel by pixel: 255 where
/// `min_level <= value <= level`, else 0.
pub fn expected_mask(data: &[u8], level: u8, min_level: u8) -> Vec<u8> {
    data.iter()
        .map(|&v| if v >= min_level && v <= level { 255 } else { 0 })
        .collect()
}

/// Write `data` as a single-band GeoTIFF at `path`.
pub fn write_lossyear_tiff(
    path: &Path,
    width: usize,
    height: usize,
    data: &[u8],
    georef: &GeoReference,
) -> geotiff::Result<()> {
    assert_eq!(data.len(), width * height, "data does not match dimensions");
    let mut writer = GeoTiffWriter::create(path, width, height, georef)?;
    for (y, row) in data.chunks_exact(width).enumerate() {
        writer.write_row(y, row)?;
    }
    writer.finish()
}
