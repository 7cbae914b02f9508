//! Error types for the lossyear splitter.
//!
//! Every error is fatal to a run. Variants carry the file, row and level
//! involved so the driver can report exactly what failed.

use std::path::PathBuf;

use geotiff::GeoTiffError;
use thiserror::Error;

/// Errors that can occur while splitting a raster or building pyramids.
#[derive(Error, Debug)]
pub enum SplitError {
    /// An output path exists before any dataset was created.
    #[error("output {} already exists, aborting", path.display())]
    OutputExists { path: PathBuf },

    /// The source raster could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: GeoTiffError,
    },

    /// Reading a source row failed.
    #[error("failed to read row {row}: {source}")]
    Read {
        row: usize,
        #[source]
        source: GeoTiffError,
    },

    /// Creating a mask dataset failed.
    #[error("failed to create {} for level {level}: {source}", path.display())]
    Create {
        path: PathBuf,
        level: u8,
        #[source]
        source: GeoTiffError,
    },

    /// Writing a mask row failed.
    #[error("failed to write row {row} of {} for level {level}: {source}", path.display())]
    Write {
        path: PathBuf,
        level: u8,
        row: usize,
        #[source]
        source: GeoTiffError,
    },

    /// Closing a mask dataset failed.
    #[error("failed to close {} for level {level}: {source}", path.display())]
    Close {
        path: PathBuf,
        level: u8,
        #[source]
        source: GeoTiffError,
    },

    /// Tile container translation or overview construction failed.
    #[error("failed to encode pyramid {} for level {level}: {source}", path.display())]
    Encode {
        path: PathBuf,
        level: u8,
        #[source]
        source: GeoTiffError,
    },

    /// A pyramid task died without returning a result.
    #[error("pyramid task for level {level} failed: {message}")]
    TaskFailed { level: u8, message: String },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Broad classification of a [`SplitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected before any output was touched.
    Precondition,
    /// Read or write against source or mask rasters.
    Io,
    /// Tile container encoding.
    Encoding,
    /// Bad parameters.
    Config,
}

impl SplitError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutputExists { .. } => ErrorKind::Precondition,
            Self::Open { .. }
            | Self::Read { .. }
            | Self::Create { .. }
            | Self::Write { .. }
            | Self::Close { .. } => ErrorKind::Io,
            Self::Encode { .. } | Self::TaskFailed { .. } => ErrorKind::Encoding,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }
}

/// Result type for splitter operations.
pub type Result<T> = std::result::Result<T, SplitError>;
