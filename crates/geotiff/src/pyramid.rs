//! Tiled multi-resolution TIFF ("pyramid TIFF") encoding.
//!
//! The container holds the full-resolution raster as square deflate tiles,
//! followed by one reduced-resolution page per overview factor:
//!
//! ```text
//! IFD 0: full resolution, georeferenced        (NewSubfileType = 0)
//! IFD 1: ceil(W/2) x ceil(H/2)                  (NewSubfileType = 1)
//! IFD 2: ceil(W/4) x ceil(H/4)                  (NewSubfileType = 1)
//! ...
//! ```
//!
//! This is the layout GDAL and most tile servers read as internal
//! overviews. Every page is produced in a streaming pass over the source
//! rows, buffering only one row of tiles per page.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{GeoTiffError, Result};
use crate::georef::GeoReference;
use crate::ifd::{
    self, FieldValue, Ifd, TiffFile, SUBFILE_REDUCED, TILE_BYTE_COUNTS, TILE_LENGTH,
    TILE_OFFSETS, TILE_WIDTH,
};
use crate::reader::GeoTiffReader;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Resampling used to build reduced-resolution pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Pixel nearest to the center of each block. Never invents new values,
    /// so categorical and binary rasters stay categorical.
    #[default]
    Nearest,
}

impl Resampling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
        }
    }
}

impl std::fmt::Display for Resampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One resolution level being tiled.
struct Page {
    factor: usize,
    width: usize,
    height: usize,
    tile_size: usize,
    tiles_across: usize,
    /// One row of tiles, `tile_size` rows of `tiles_across * tile_size` pixels.
    band: Vec<u8>,
    band_rows: usize,
    rows_done: usize,
    tile_offsets: Vec<u32>,
    tile_byte_counts: Vec<u32>,
}

impl Page {
    fn new(source_width: usize, source_height: usize, factor: usize, tile_size: usize) -> Self {
        let width = source_width.div_ceil(factor);
        let height = source_height.div_ceil(factor);
        let tiles_across = width.div_ceil(tile_size);
        let tiles_down = height.div_ceil(tile_size);
        Self {
            factor,
            width,
            height,
            tile_size,
            tiles_across,
            band: vec![0; tiles_across * tile_size * tile_size],
            band_rows: 0,
            rows_done: 0,
            tile_offsets: Vec::with_capacity(tiles_across * tiles_down),
            tile_byte_counts: Vec::with_capacity(tiles_across * tiles_down),
        }
    }

    /// Source pixel sampled for output coordinate `out` along an axis of `len`.
    fn sample(&self, out: usize, len: usize) -> usize {
        (out * self.factor + self.factor / 2).min(len - 1)
    }

    /// Source row needed next, or `None` once the page is complete.
    fn wanted_row(&self, source_height: usize) -> Option<usize> {
        (self.rows_done < self.height).then(|| self.sample(self.rows_done, source_height))
    }

    fn push_row(&mut self, source_row: &[u8], file: &mut TiffFile) -> Result<()> {
        let stride = self.tiles_across * self.tile_size;
        let factor = self.factor;
        let start = self.band_rows * stride;
        let dst = &mut self.band[start..start + self.width];
        if factor == 1 {
            dst.copy_from_slice(source_row);
        } else {
            let last = source_row.len() - 1;
            for (x, px) in dst.iter_mut().enumerate() {
                *px = source_row[(x * factor + factor / 2).min(last)];
            }
        }
        self.band_rows += 1;
        self.rows_done += 1;

        if self.band_rows == self.tile_size || self.rows_done == self.height {
            self.flush_band(file)?;
        }
        Ok(())
    }

    /// Cut the buffered band into tiles and append them in row-major order.
    fn flush_band(&mut self, file: &mut TiffFile) -> Result<()> {
        let stride = self.tiles_across * self.tile_size;
        let mut tile = vec![0u8; self.tile_size * self.tile_size];

        for across in 0..self.tiles_across {
            let x0 = across * self.tile_size;
            for (row, out) in tile.chunks_exact_mut(self.tile_size).enumerate() {
                let src = row * stride + x0;
                out.copy_from_slice(&self.band[src..src + self.tile_size]);
            }
            let compressed = ifd::deflate(&tile)?;
            self.tile_offsets.push(file.append(&compressed)?);
            self.tile_byte_counts.push(ifd::to_u32(compressed.len())?);
        }

        // Edge tiles are zero padded
        self.band.fill(0);
        self.band_rows = 0;
        Ok(())
    }

    fn directory(&self, subfile_type: u32) -> Result<Ifd> {
        let mut directory = Ifd::gray8(self.width, self.height, subfile_type)?;
        directory.insert(TILE_WIDTH, FieldValue::Long(vec![ifd::to_u32(self.tile_size)?]));
        directory.insert(TILE_LENGTH, FieldValue::Long(vec![ifd::to_u32(self.tile_size)?]));
        directory.insert(TILE_OFFSETS, FieldValue::Long(self.tile_offsets.clone()));
        directory.insert(
            TILE_BYTE_COUNTS,
            FieldValue::Long(self.tile_byte_counts.clone()),
        );
        Ok(directory)
    }
}

/// A pyramid TIFF under construction.
pub struct PyramidTiff {
    path: PathBuf,
    file: TiffFile,
    source: GeoTiffReader,
    georef: GeoReference,
    tile_size: usize,
    base: Page,
    overviews: Vec<Page>,
}

impl std::fmt::Debug for PyramidTiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyramidTiff")
            .field("path", &self.path)
            .field("tile_size", &self.tile_size)
            .field("overviews", &self.overview_factors())
            .finish()
    }
}

impl PyramidTiff {
    /// Encode the raster at `source` as a tiled container at `dest`.
    ///
    /// Fails if `dest` already exists.
    pub fn translate(
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        tile_size: usize,
    ) -> Result<Self> {
        if tile_size == 0 || tile_size % 16 != 0 {
            return Err(GeoTiffError::invalid_argument(format!(
                "tile size must be a non-zero multiple of 16, got {}",
                tile_size
            )));
        }

        let mut source = GeoTiffReader::open(source)?;
        let path = dest.as_ref().to_path_buf();
        let mut file = TiffFile::create_new(&path)?;

        let (width, height) = (source.width(), source.height());
        let mut base = Page::new(width, height, 1, tile_size);
        let mut row = vec![0u8; width];
        for y in 0..height {
            source.read_row(y, &mut row)?;
            base.push_row(&row, &mut file)?;
        }

        debug!(
            source = %source.path().display(),
            dest = %path.display(),
            tiles = base.tile_offsets.len(),
            "Translated raster to tiles"
        );

        Ok(Self {
            path,
            file,
            georef: source.georeference().clone(),
            source,
            tile_size,
            base,
            overviews: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Factors of the overview pages built so far.
    pub fn overview_factors(&self) -> Vec<usize> {
        self.overviews.iter().map(|p| p.factor).collect()
    }

    /// Append one reduced-resolution page per factor.
    ///
    /// `factors` must be strictly increasing and each at least 2. `bands`
    /// uses 1-based band numbers; only `[1]` exists in these files.
    pub fn build_overviews(
        &mut self,
        resampling: Resampling,
        factors: &[usize],
        bands: &[usize],
    ) -> Result<()> {
        if bands != [1] {
            return Err(GeoTiffError::invalid_argument(format!(
                "band list must be [1], got {:?}",
                bands
            )));
        }
        if factors.is_empty() {
            return Ok(());
        }
        if factors[0] < 2 || factors.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GeoTiffError::invalid_argument(format!(
                "overview factors must be increasing and >= 2, got {:?}",
                factors
            )));
        }
        if let Some(last) = self.overviews.last() {
            if factors[0] <= last.factor {
                return Err(GeoTiffError::invalid_argument(format!(
                    "overview factor {} already built",
                    factors[0]
                )));
            }
        }

        let (width, height) = (self.source.width(), self.source.height());
        let mut pages: Vec<Page> = factors
            .iter()
            .map(|&factor| Page::new(width, height, factor, self.tile_size))
            .collect();

        let mut row = vec![0u8; width];
        for y in 0..height {
            if !pages.iter().any(|p| p.wanted_row(height) == Some(y)) {
                continue;
            }
            self.source.read_row(y, &mut row)?;
            for page in pages.iter_mut() {
                if page.wanted_row(height) == Some(y) {
                    page.push_row(&row, &mut self.file)?;
                }
            }
        }

        info!(
            dest = %self.path.display(),
            resampling = %resampling,
            factors = ?factors,
            "Built overviews"
        );

        self.overviews.extend(pages);
        Ok(())
    }

    /// Write all directories and flush.
    pub fn finish(self) -> Result<()> {
        let mut file = self.file;

        // Written last page first so each directory knows its successor
        let mut next = 0u32;
        for page in self.overviews.iter().rev() {
            next = file.write_ifd(&page.directory(SUBFILE_REDUCED)?, next)?;
        }
        let mut base = self.base.directory(0)?;
        self.georef.apply(&mut base);
        let first = file.write_ifd(&base, next)?;
        file.finish(first)?;

        debug!(path = %self.path.display(), "Closed pyramid TIFF");
        Ok(())
    }
}
