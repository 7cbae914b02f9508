//! Two-phase driver: split rows into masks, then build pyramids.
//!
//! ```text
//! source ──► row loop ───────────────────────────► MaskStreamSet ──close──┐
//!              │  RowChunks splits the row                                │
//!              │  rayon scope: K ChunkViews fill                          │
//!              │  every level, join (barrier)                             │
//!              └─ write row y of every level                              ▼
//!                                                   PyramidDispatcher (≤ K tasks)
//!                                                   translate + overviews
//! ```
//!
//! Rows are strictly sequential because each mask sink only accepts rows in
//! increasing order; only the pixels within a row are computed in parallel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument};

use crate::chunker::RowChunks;
use crate::config::SplitConfig;
use crate::dispatcher::{PyramidDispatcher, PyramidOutput};
use crate::error::{Result, SplitError};
use crate::mask_rows::MaskRows;
use crate::progress::{LogProgress, Phase, ProgressSink};
use crate::raster::{GeoTiffDriver, MaskDriver, PyramidTiffEncoder, RasterSource, TileEncoder};
use crate::streams::{MaskDataset, MaskStreamSet};
use crate::threshold::ThresholdRange;

/// Outcome of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub width: usize,
    pub height: usize,
    pub levels: usize,
    pub masks: Vec<PathBuf>,
    pub pyramids: Vec<PyramidOutput>,
    pub rows_ms: u64,
    pub pyramids_ms: u64,
}

/// Splits a lossyear raster into cumulative masks and their pyramids.
pub struct YearSplit<D: MaskDriver, E: TileEncoder> {
    config: SplitConfig,
    thresholds: ThresholdRange,
    driver: D,
    dispatcher: PyramidDispatcher<E>,
    pool: rayon::ThreadPool,
    progress: Arc<dyn ProgressSink>,
}

impl<D: MaskDriver, E: TileEncoder> std::fmt::Debug for YearSplit<D, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YearSplit")
            .field("config", &self.config)
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl YearSplit<GeoTiffDriver, PyramidTiffEncoder> {
    /// Splitter writing GeoTIFF masks and pyramid TIFF containers.
    pub fn geotiff(config: SplitConfig) -> Result<Self> {
        let encoder = PyramidTiffEncoder {
            tile_size: config.tile_size,
        };
        Self::new(config, GeoTiffDriver, encoder)
    }
}

impl<D: MaskDriver, E: TileEncoder> YearSplit<D, E> {
    pub fn new(config: SplitConfig, driver: D, encoder: E) -> Result<Self> {
        config.validate().map_err(SplitError::InvalidConfig)?;
        let thresholds = config.thresholds()?;
        let dispatcher = PyramidDispatcher::new(encoder, config.workers, config.tile_size)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("yearsplit-row-{}", i))
            .build()
            .map_err(|e| SplitError::invalid_config(format!("row worker pool: {}", e)))?;

        Ok(Self {
            config,
            thresholds,
            driver,
            dispatcher,
            pool,
            progress: Arc::new(LogProgress::new()),
        })
    }

    /// Replace the default tracing-based progress reporting.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    pub fn thresholds(&self) -> ThresholdRange {
        self.thresholds
    }

    /// Phase one: write every mask row by row, then close the masks.
    ///
    /// Nothing is created if any output path already exists. Any read or
    /// write failure aborts immediately, leaving partial files behind.
    #[instrument(skip_all, fields(width = source.width(), height = source.height()))]
    pub fn split_rows<S: RasterSource>(&self, source: &mut S) -> Result<Vec<MaskDataset>> {
        let start = Instant::now();
        let (width, height) = (source.width(), source.height());

        let mut streams = MaskStreamSet::create(
            &self.driver,
            self.thresholds,
            source.georeference(),
            width,
            height,
            &self.config.output_dir,
            self.config.build_pyramids,
        )?;

        let chunks = RowChunks::new(width, self.config.workers)?;
        let mut rows = MaskRows::new(self.thresholds, width);
        let mut row = vec![0u8; width];

        info!(
            levels = self.thresholds.len(),
            min_level = self.thresholds.min(),
            max_level = self.thresholds.max(),
            workers = chunks.len(),
            "Splitting rows"
        );

        for y in 0..height {
            source
                .read_row(y, &mut row)
                .map_err(|source| SplitError::Read { row: y, source })?;

            let views = rows.disjoint_views(&chunks);
            let pixels = row.as_slice();
            self.pool.scope(|scope| {
                for mut view in views {
                    scope.spawn(move |_| view.fill(pixels));
                }
            });

            streams.write_rows(y, &rows)?;
            self.progress
                .advance(Phase::Rows, (y + 1) as u64, height as u64);
        }

        let masks = streams.close()?;
        info!(
            masks = masks.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Row phase complete"
        );
        Ok(masks)
    }

    /// Phase two: encode each closed mask as a tile container.
    pub async fn build_pyramids(&self, masks: Vec<MaskDataset>) -> Result<Vec<PyramidOutput>> {
        if !self.config.build_pyramids {
            info!("Pyramid construction disabled");
            return Ok(Vec::new());
        }
        self.dispatcher.dispatch(masks, self.progress.clone()).await
    }

    /// Run both phases.
    pub async fn run<S: RasterSource>(&self, mut source: S) -> Result<RunSummary> {
        let (width, height) = (source.width(), source.height());

        let rows_start = Instant::now();
        let masks = self.split_rows(&mut source)?;
        let rows_ms = rows_start.elapsed().as_millis() as u64;
        drop(source);

        let mask_paths = masks.iter().map(|m| m.path.clone()).collect();
        let pyramids_start = Instant::now();
        let pyramids = self.build_pyramids(masks).await?;
        let pyramids_ms = pyramids_start.elapsed().as_millis() as u64;

        Ok(RunSummary {
            width,
            height,
            levels: self.thresholds.len(),
            masks: mask_paths,
            pyramids,
            rows_ms,
            pyramids_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDriver, MemoryEncoder, MemorySource};
    use crate::naming;
    use crate::progress::NoProgress;

    fn splitter(
        dir: &std::path::Path,
        min_level: u8,
        max_level: u8,
        workers: usize,
    ) -> (YearSplit<MemoryDriver, MemoryEncoder>, MemoryDriver, MemoryEncoder) {
        let config = SplitConfig {
            min_level,
            max_level,
            workers,
            output_dir: dir.to_path_buf(),
            ..Default::default()
        };
        let driver = MemoryDriver::default();
        let encoder = MemoryEncoder::default();
        let split = YearSplit::new(config, driver.clone(), encoder.clone())
            .unwrap()
            .with_progress(Arc::new(NoProgress));
        (split, driver, encoder)
    }

    #[test]
    fn test_single_row_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let (split, driver, _) = splitter(dir.path(), 1, 3, 2);
        let mut source = MemorySource::new(5, 1, vec![0, 1, 2, 3, 4]);

        let masks = split.split_rows(&mut source).unwrap();
        let rows: Vec<Vec<Vec<u8>>> = masks.iter().map(|m| driver.rows_of(&m.path)).collect();
        assert_eq!(
            rows,
            vec![
                vec![vec![0, 255, 0, 0, 0]],
                vec![vec![0, 255, 255, 0, 0]],
                vec![vec![0, 255, 255, 255, 0]],
            ]
        );
    }

    #[test]
    fn test_more_workers_than_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let (split, driver, _) = splitter(dir.path(), 2, 3, 8);
        let mut source = MemorySource::new(3, 2, vec![1, 2, 3, 3, 2, 0]);

        let masks = split.split_rows(&mut source).unwrap();
        assert_eq!(driver.rows_of(&masks[0].path), vec![vec![0, 255, 0], vec![0, 255, 0]]);
        assert_eq!(
            driver.rows_of(&masks[1].path),
            vec![vec![0, 255, 255], vec![255, 255, 0]]
        );
    }

    #[test]
    fn test_rows_written_in_increasing_order() {
        let dir = tempfile::tempdir().unwrap();
        let (split, driver, _) = splitter(dir.path(), 1, 5, 3);
        let (width, height) = (17, 9);
        let data = (0..width * height).map(|i| (i % 7) as u8).collect();
        let mut source = MemorySource::new(width, height, data);

        let masks = split.split_rows(&mut source).unwrap();
        assert_eq!(masks.len(), 5);

        let log = driver.log.lock().unwrap();
        assert_eq!(log.writes.len(), 5 * height);
        let order: Vec<usize> = log.writes.iter().map(|(_, y)| *y).collect();
        assert!(order.windows(2).all(|w| w[0] <= w[1]));
        for mask in &masks {
            let ys: Vec<usize> = log
                .writes
                .iter()
                .filter(|(p, _)| *p == mask.path)
                .map(|(_, y)| *y)
                .collect();
            assert_eq!(ys, (0..height).collect::<Vec<_>>());
        }
        assert_eq!(log.closed.len(), 5);
    }

    #[test]
    fn test_masks_are_cumulative() {
        let dir = tempfile::tempdir().unwrap();
        let (split, driver, _) = splitter(dir.path(), 1, 20, 4);
        let data: Vec<u8> = (0..64u8).map(|v| v % 23).collect();
        let mut source = MemorySource::new(16, 4, data);

        let masks = split.split_rows(&mut source).unwrap();
        for pair in masks.windows(2) {
            let lower = driver.rows_of(&pair[0].path);
            let upper = driver.rows_of(&pair[1].path);
            for (lo, up) in lower.iter().flatten().zip(upper.iter().flatten()) {
                assert!(*lo == 0 || *up == 255);
            }
        }
    }

    #[test]
    fn test_read_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let (split, driver, _) = splitter(dir.path(), 1, 2, 2);
        let mut source = MemorySource::new(2, 3, vec![1; 6]);
        source.fail_at = Some(1);

        let err = split.split_rows(&mut source).unwrap_err();
        assert!(matches!(err, SplitError::Read { row: 1, .. }));

        let log = driver.log.lock().unwrap();
        assert_eq!(log.writes.len(), 2);
        assert!(log.closed.is_empty());
    }

    #[test]
    fn test_existing_output_aborts_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let (split, driver, _) = splitter(dir.path(), 1, 20, 4);
        let mut source = MemorySource::new(4, 4, vec![5; 16]);
        let existing = naming::mask_path(dir.path(), 5, &source.georef.transform);
        std::fs::write(&existing, b"").unwrap();
        source.fail_at = Some(0);

        let err = split.split_rows(&mut source).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Precondition);
        assert!(driver.log.lock().unwrap().created.is_empty());
    }

    #[tokio::test]
    async fn test_run_builds_a_pyramid_per_level() {
        let dir = tempfile::tempdir().unwrap();
        let (split, _, encoder) = splitter(dir.path(), 1, 3, 2);
        let source = MemorySource::new(300, 300, vec![2; 300 * 300]);

        let summary = split.run(source).await.unwrap();
        assert_eq!((summary.width, summary.height, summary.levels), (300, 300, 3));
        assert_eq!(summary.masks.len(), 3);
        assert_eq!(summary.pyramids.len(), 3);
        for (mask, pyramid) in summary.masks.iter().zip(&summary.pyramids) {
            assert_eq!(pyramid.path, naming::container_path(mask));
            assert_eq!(pyramid.overview_factors, vec![2]);
        }
        assert_eq!(encoder.state.translated.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_run_without_pyramids() {
        let dir = tempfile::tempdir().unwrap();
        let config = SplitConfig {
            max_level: 2,
            build_pyramids: false,
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let encoder = MemoryEncoder::default();
        let split = YearSplit::new(config, MemoryDriver::default(), encoder.clone()).unwrap();

        let summary = split.run(MemorySource::new(2, 2, vec![1; 4])).await.unwrap();
        assert_eq!(summary.masks.len(), 2);
        assert!(summary.pyramids.is_empty());
        assert!(encoder.state.translated.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SplitConfig {
            workers: 0,
            ..Default::default()
        };
        let err = YearSplit::new(config, MemoryDriver::default(), MemoryEncoder::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
