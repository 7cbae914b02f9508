//! Cumulative deforestation masks from a lossyear raster.
//!
//! A lossyear raster stores, per pixel, the year of forest loss as an offset
//! from 2000 (0 means no loss). This crate turns one such raster into a set
//! of binary masks, one per year level `L`, where a pixel is set when its
//! loss happened in any year from `min_level` up to and including `L`. Each
//! mask is then re-encoded as a tiled pyramid for display.
//!
//! # Architecture
//!
//! ```text
//! RasterSource (lossyear GeoTIFF)
//!      │
//!      ▼
//! YearSplit::split_rows
//!      │
//!      ├─► read row y
//!      │
//!      ├─► RowChunks / MaskRows: K workers threshold their slice
//!      │   for every level (rayon scope, joined per row)
//!      │
//!      └─► MaskStreamSet writes row y of every level
//!               │
//!               ▼ close
//!          Vec<MaskDataset>
//!               │
//!               ▼
//! PyramidDispatcher (≤ K concurrent blocking tasks)
//!      │
//!      └─► TileEncoder::translate + build_overviews per level
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lossyear_split::{open_geotiff, SplitConfig, YearSplit};
//!
//! let source = open_geotiff("Hansen_GFC-2020-v1.8_lossyear_10N_080W.tif".as_ref())?;
//! let splitter = YearSplit::geotiff(SplitConfig::default())?;
//! let summary = splitter.run(source).await?;
//! println!("wrote {} masks", summary.masks.len());
//! ```

pub mod chunker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod mask_rows;
pub mod naming;
pub mod overview;
pub mod pipeline;
pub mod progress;
pub mod raster;
pub mod streams;
pub mod threshold;

#[cfg(test)]
mod memory;

// Re-export commonly used types at crate root
pub use chunker::RowChunks;
pub use config::{SplitConfig, DEFAULT_WORKERS};
pub use dispatcher::{build_pyramid, PyramidDispatcher, PyramidOutput};
pub use error::{ErrorKind, Result, SplitError};
pub use mask_rows::{ChunkView, MaskRows};
pub use overview::{plan_overviews, DEFAULT_MIN_TILE_SIZE};
pub use pipeline::{RunSummary, YearSplit};
pub use progress::{LogProgress, NoProgress, Phase, ProgressSink};
pub use raster::{
    open_geotiff, GeoTiffDriver, MaskDriver, MaskSink, PyramidTiffEncoder, RasterSource,
    TileContainer, TileEncoder,
};
pub use streams::{MaskDataset, MaskStreamSet};
pub use threshold::{mask, ThresholdRange, MASK_CLEAR, MASK_SET};
