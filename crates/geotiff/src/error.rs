//! Error types for GeoTIFF I/O.

use thiserror::Error;

/// Errors that can occur while reading or writing GeoTIFF files.
#[derive(Error, Debug)]
pub enum GeoTiffError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TIFF decoder rejected the file.
    #[error("TIFF decoding error: {0}")]
    Decode(#[from] tiff::TiffError),

    /// The file is valid TIFF but uses a layout we do not handle.
    #[error("unsupported raster: {0}")]
    Unsupported(String),

    /// Row requested or written outside the raster.
    #[error("row {row} is outside raster of height {height}")]
    RowOutOfBounds { row: usize, height: usize },

    /// Rows must be written strictly in increasing order.
    #[error("rows must be written in order: expected row {expected}, got {got}")]
    RowOrder { expected: usize, got: usize },

    /// Row buffer length does not match the raster width.
    #[error("row length mismatch: expected {expected} pixels, got {got}")]
    RowLength { expected: usize, got: usize },

    /// Dataset was closed before every row was written.
    #[error("dataset closed after {written} of {height} rows")]
    Incomplete { written: usize, height: usize },

    /// Classic TIFF cannot address data beyond 4 GiB.
    #[error("file exceeds the 4 GiB classic TIFF limit")]
    TooLarge,

    /// Invalid argument passed to an encoder.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl GeoTiffError {
    /// Create an Unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type for GeoTIFF operations.
pub type Result<T> = std::result::Result<T, GeoTiffError>;
