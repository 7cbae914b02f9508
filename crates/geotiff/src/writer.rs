//! Streaming GeoTIFF writer.
//!
//! Rows are deflated and appended as one-row strips the moment they arrive,
//! so memory use is independent of raster height. The directory is written
//! on [`GeoTiffWriter::finish`].

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GeoTiffError, Result};
use crate::georef::GeoReference;
use crate::ifd::{
    self, FieldValue, Ifd, TiffFile, ROWS_PER_STRIP, STRIP_BYTE_COUNTS, STRIP_OFFSETS,
};

/// Single-band 8-bit GeoTIFF written strictly top to bottom.
pub struct GeoTiffWriter {
    path: PathBuf,
    file: TiffFile,
    width: usize,
    height: usize,
    georef: GeoReference,
    next_row: usize,
    strip_offsets: Vec<u32>,
    strip_byte_counts: Vec<u32>,
}

impl std::fmt::Debug for GeoTiffWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoTiffWriter")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("next_row", &self.next_row)
            .finish()
    }
}

impl GeoTiffWriter {
    /// Create a new dataset at `path`.
    ///
    /// Fails if a file already exists there; existing data is never replaced.
    pub fn create(
        path: impl AsRef<Path>,
        width: usize,
        height: usize,
        georef: &GeoReference,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GeoTiffError::invalid_argument(format!(
                "raster dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let path = path.as_ref().to_path_buf();
        let file = TiffFile::create_new(&path)?;

        debug!(path = %path.display(), width, height, "Created GeoTIFF");

        Ok(Self {
            path,
            file,
            width,
            height,
            georef: georef.clone(),
            next_row: 0,
            strip_offsets: Vec::with_capacity(height),
            strip_byte_counts: Vec::with_capacity(height),
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

    /// Number of rows written so far.
    pub fn rows_written(&self) -> usize {
        self.next_row
    }

    /// Write row `y`. Rows must arrive as 0, 1, 2, ... with no gaps.
    pub fn write_row(&mut self, y: usize, row: &[u8]) -> Result<()> {
        if y >= self.height {
            return Err(GeoTiffError::RowOutOfBounds {
                row: y,
                height: self.height,
            });
        }
        if y != self.next_row {
            return Err(GeoTiffError::RowOrder {
                expected: self.next_row,
                got: y,
            });
        }
        if row.len() != self.width {
            return Err(GeoTiffError::RowLength {
                expected: self.width,
                got: row.len(),
            });
        }

        let strip = ifd::deflate(row)?;
        let offset = self.file.append(&strip)?;
        self.strip_offsets.push(offset);
        self.strip_byte_counts.push(ifd::to_u32(strip.len())?);
        self.next_row += 1;
        Ok(())
    }

    /// Write the directory and flush. Every row must have been written.
    pub fn finish(self) -> Result<()> {
        if self.next_row != self.height {
            return Err(GeoTiffError::Incomplete {
                written: self.next_row,
                height: self.height,
            });
        }

        let mut directory = Ifd::gray8(self.width, self.height, 0)?;
        directory.insert(ROWS_PER_STRIP, FieldValue::Long(vec![1]));
        directory.insert(STRIP_OFFSETS, FieldValue::Long(self.strip_offsets));
        directory.insert(STRIP_BYTE_COUNTS, FieldValue::Long(self.strip_byte_counts));
        self.georef.apply(&mut directory);

        let mut file = self.file;
        let first = file.write_ifd(&directory, 0)?;
        file.finish(first)?;

        debug!(path = %self.path.display(), "Closed GeoTIFF");
        Ok(())
    }
}
