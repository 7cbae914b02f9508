//! Seams between the splitter and the raster libraries.
//!
//! The row engine and pyramid dispatcher only see these traits; the GeoTIFF
//! implementations live at the bottom of this module. Tests substitute
//! in-memory doubles.

use std::path::Path;

use geotiff::{GeoReference, GeoTiffReader, GeoTiffWriter, PyramidTiff, Resampling};

/// Read-only single-band raster with row access.
pub trait RasterSource: Send {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn georeference(&self) -> &GeoReference;

    /// Read row `y` (x = 0, full width) into `buf`.
    fn read_row(&mut self, y: usize, buf: &mut [u8]) -> geotiff::Result<()>;
}

/// Creates mask datasets.
pub trait MaskDriver: Send + Sync {
    type Sink: MaskSink;

    /// Create a single-band 8-bit dataset carrying `georef`.
    fn create(
        &self,
        path: &Path,
        width: usize,
        height: usize,
        georef: &GeoReference,
    ) -> geotiff::Result<Self::Sink>;
}

/// A mask dataset open for writing, top to bottom.
pub trait MaskSink: Send {
    fn write_row(&mut self, y: usize, row: &[u8]) -> geotiff::Result<()>;

    /// Flush and release the dataset.
    fn close(self) -> geotiff::Result<()>;
}

/// Encodes closed mask datasets into tile containers.
pub trait TileEncoder: Send + Sync + 'static {
    type Container: TileContainer;

    /// Translate the raster at `source` into a container at `dest`.
    fn translate(&self, source: &Path, dest: &Path) -> geotiff::Result<Self::Container>;
}

/// A tile container under construction.
pub trait TileContainer: Send {
    /// Add reduced-resolution levels. `bands` are 1-based band numbers.
    fn build_overviews(
        &mut self,
        resampling: Resampling,
        factors: &[usize],
        bands: &[usize],
    ) -> geotiff::Result<()>;

    fn close(self) -> geotiff::Result<()>;
}

// ============================================================================
// GeoTIFF implementations
// ============================================================================

/// Open a lossyear GeoTIFF as a [`RasterSource`].
pub fn open_geotiff(path: &Path) -> crate::Result<GeoTiffReader> {
    GeoTiffReader::open(path).map_err(|source| crate::SplitError::Open {
        path: path.to_path_buf(),
        source,
    })
}

impl RasterSource for GeoTiffReader {
    fn width(&self) -> usize {
        GeoTiffReader::width(self)
    }

    fn height(&self) -> usize {
        GeoTiffReader::height(self)
    }

    fn georeference(&self) -> &GeoReference {
        GeoTiffReader::georeference(self)
    }

    fn read_row(&mut self, y: usize, buf: &mut [u8]) -> geotiff::Result<()> {
        GeoTiffReader::read_row(self, y, buf)
    }
}

/// Writes masks as deflate-compressed GeoTIFFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffDriver;

impl MaskDriver for GeoTiffDriver {
    type Sink = GeoTiffWriter;

    fn create(
        &self,
        path: &Path,
        width: usize,
        height: usize,
        georef: &GeoReference,
    ) -> geotiff::Result<GeoTiffWriter> {
        GeoTiffWriter::create(path, width, height, georef)
    }
}

impl MaskSink for GeoTiffWriter {
    fn write_row(&mut self, y: usize, row: &[u8]) -> geotiff::Result<()> {
        GeoTiffWriter::write_row(self, y, row)
    }

    fn close(self) -> geotiff::Result<()> {
        self.finish()
    }
}

/// Encodes pyramid TIFF containers with square tiles.
#[derive(Debug, Clone, Copy)]
pub struct PyramidTiffEncoder {
    pub tile_size: usize,
}

impl Default for PyramidTiffEncoder {
    fn default() -> Self {
        Self {
            tile_size: geotiff::DEFAULT_TILE_SIZE,
        }
    }
}

impl TileEncoder for PyramidTiffEncoder {
    type Container = PyramidTiff;

    fn translate(&self, source: &Path, dest: &Path) -> geotiff::Result<PyramidTiff> {
        PyramidTiff::translate(source, dest, self.tile_size)
    }
}

impl TileContainer for PyramidTiff {
    fn build_overviews(
        &mut self,
        resampling: Resampling,
        factors: &[usize],
        bands: &[usize],
    ) -> geotiff::Result<()> {
        PyramidTiff::build_overviews(self, resampling, factors, bands)
    }

    fn close(self) -> geotiff::Result<()> {
        self.finish()
    }
}
