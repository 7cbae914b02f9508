//! Streaming GeoTIFF I/O for single-band 8-bit rasters.
//!
//! This crate covers the three raster operations the lossyear splitter
//! needs, all without holding a full raster in memory:
//!
//! - [`GeoTiffReader`]: row access to stripped or tiled GeoTIFFs, decoded
//!   with the `tiff` crate one block-row at a time
//! - [`GeoTiffWriter`]: row-by-row output with deflate strips and the
//!   source's georeferencing copied verbatim
//! - [`PyramidTiff`]: tiled multi-resolution container with nearest
//!   neighbour overview pages
//!
//! # Example
//!
//! ```ignore
//! use geotiff::{GeoTiffReader, GeoTiffWriter};
//!
//! let mut source = GeoTiffReader::open("lossyear.tif")?;
//! let mut out = GeoTiffWriter::create("copy.tiff", source.width(), source.height(), source.georeference())?;
//! let mut row = vec![0u8; source.width()];
//! for y in 0..source.height() {
//!     source.read_row(y, &mut row)?;
//!     out.write_row(y, &row)?;
//! }
//! out.finish()?;
//! ```

pub mod error;
pub mod georef;
mod ifd;
pub mod pyramid;
pub mod reader;
pub mod writer;

pub use error::{GeoTiffError, Result};
pub use georef::{GeoKeys, GeoReference, GeoTransform};
pub use pyramid::{PyramidTiff, Resampling, DEFAULT_TILE_SIZE};
pub use reader::GeoTiffReader;
pub use writer::GeoTiffWriter;
