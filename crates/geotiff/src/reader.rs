//! Row-oriented GeoTIFF reading.
//!
//! Sources such as the Hansen Global Forest Change tiles are far too large to
//! decode in one go (40000 x 40000 pixels), so rows are served from a cache
//! holding a single decoded block-row: one strip for stripped files, one row
//! of tiles for tiled files.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;
use tracing::debug;

use crate::error::{GeoTiffError, Result};
use crate::georef::GeoReference;

/// Read-only view of a single-band 8-bit GeoTIFF.
pub struct GeoTiffReader {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    width: usize,
    height: usize,
    block_width: usize,
    block_height: usize,
    blocks_across: usize,
    georef: GeoReference,
    /// Index of the block-row currently held in `band`.
    cached_band: Option<usize>,
    band: Vec<u8>,
}

impl std::fmt::Debug for GeoTiffReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoTiffReader")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("block_width", &self.block_width)
            .field("block_height", &self.block_height)
            .finish()
    }
}

impl GeoTiffReader {
    /// Open a GeoTIFF for row access.
    ///
    /// Only single-band unsigned 8-bit rasters are accepted.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

        match decoder.colortype()? {
            ColorType::Gray(8) => {}
            other => {
                return Err(GeoTiffError::unsupported(format!(
                    "{}: expected a single 8-bit band, found {:?}",
                    path.display(),
                    other
                )))
            }
        }

        let (width, height) = decoder.dimensions()?;
        let (block_width, block_height) = decoder.chunk_dimensions();
        let (width, height) = (width as usize, height as usize);
        let (block_width, block_height) = (block_width as usize, block_height as usize);
        if block_width == 0 || block_height == 0 {
            return Err(GeoTiffError::unsupported("zero-sized strips or tiles"));
        }

        let georef = GeoReference::read(&mut decoder)?;

        debug!(
            path = %path.display(),
            width,
            height,
            block_width,
            block_height,
            "Opened GeoTIFF"
        );

        Ok(Self {
            path,
            decoder,
            width,
            height,
            block_width,
            block_height,
            blocks_across: width.div_ceil(block_width),
            georef,
            cached_band: None,
            band: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of bands. Always 1, other layouts are rejected at open.
    pub fn band_count(&self) -> usize {
        1
    }

    /// Native strip or tile size as (width, height).
    pub fn block_size(&self) -> (usize, usize) {
        (self.block_width, self.block_height)
    }

    pub fn georeference(&self) -> &GeoReference {
        &self.georef
    }

    /// Read row `y` into `buf`, which must hold exactly `width` pixels.
    pub fn read_row(&mut self, y: usize, buf: &mut [u8]) -> Result<()> {
        if y >= self.height {
            return Err(GeoTiffError::RowOutOfBounds {
                row: y,
                height: self.height,
            });
        }
        if buf.len() != self.width {
            return Err(GeoTiffError::RowLength {
                expected: self.width,
                got: buf.len(),
            });
        }

        let band_index = y / self.block_height;
        if self.cached_band != Some(band_index) {
            self.load_band(band_index)?;
        }

        let start = (y - band_index * self.block_height) * self.width;
        buf.copy_from_slice(&self.band[start..start + self.width]);
        Ok(())
    }

    /// Decode every block in block-row `band_index` into `self.band`.
    fn load_band(&mut self, band_index: usize) -> Result<()> {
        let rows = self
            .block_height
            .min(self.height - band_index * self.block_height);
        self.cached_band = None;
        self.band.clear();
        self.band.resize(rows * self.width, 0);

        for across in 0..self.blocks_across {
            let chunk = (band_index * self.blocks_across + across) as u32;
            let (data_width, data_height) = self.decoder.chunk_data_dimensions(chunk);
            let (data_width, data_height) = (data_width as usize, data_height as usize);

            let data = match self.decoder.read_chunk(chunk)? {
                DecodingResult::U8(data) => data,
                _ => return Err(GeoTiffError::unsupported("non 8-bit block data")),
            };
            if data.len() < data_width * data_height || data_height > rows {
                return Err(GeoTiffError::unsupported(format!(
                    "block {} decoded to an unexpected size",
                    chunk
                )));
            }

            let x0 = across * self.block_width;
            for row in 0..data_height {
                let src = &data[row * data_width..(row + 1) * data_width];
                let dst = row * self.width + x0;
                self.band[dst..dst + data_width].copy_from_slice(src);
            }
        }

        self.cached_band = Some(band_index);
        Ok(())
    }
}
