//! Parallel pyramid construction.
//!
//! Each mask dataset is translated into a tile container and given its
//! overview levels by an independent blocking task. A semaphore caps how
//! many of those run at once, no matter how many levels the run produced.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use geotiff::Resampling;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SplitError};
use crate::naming;
use crate::overview::plan_overviews;
use crate::progress::{Phase, ProgressSink};
use crate::raster::{TileContainer, TileEncoder};
use crate::streams::MaskDataset;

/// A finished tile container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PyramidOutput {
    pub level: u8,
    pub path: PathBuf,
    pub overview_factors: Vec<usize>,
}

/// Fans pyramid construction out over a bounded number of tasks.
pub struct PyramidDispatcher<E: TileEncoder> {
    encoder: Arc<E>,
    concurrency: usize,
    min_tile_size: usize,
    resampling: Resampling,
}

impl<E: TileEncoder> std::fmt::Debug for PyramidDispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyramidDispatcher")
            .field("concurrency", &self.concurrency)
            .field("min_tile_size", &self.min_tile_size)
            .field("resampling", &self.resampling)
            .finish()
    }
}

impl<E: TileEncoder> PyramidDispatcher<E> {
    /// Create a dispatcher running at most `concurrency` pipelines at once.
    ///
    /// Overviews always use nearest resampling so masks keep only 0 and 255.
    pub fn new(encoder: E, concurrency: usize, min_tile_size: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(SplitError::invalid_config("pyramid concurrency must be >= 1"));
        }
        if min_tile_size == 0 {
            return Err(SplitError::invalid_config("tile size must be >= 1"));
        }
        Ok(Self {
            encoder: Arc::new(encoder),
            concurrency,
            min_tile_size,
            resampling: Resampling::Nearest,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Build a pyramid for every mask and wait for all of them.
    ///
    /// After the first failure no further pipelines are started; the ones
    /// already running are awaited and the first error is returned.
    #[instrument(skip_all, fields(datasets = masks.len(), concurrency = self.concurrency))]
    pub async fn dispatch(
        &self,
        masks: Vec<MaskDataset>,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Vec<PyramidOutput>> {
        let start = Instant::now();
        let total = masks.len() as u64;
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let failed = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::with_capacity(masks.len());

        info!(total, "Starting pyramid construction");

        for mask in masks {
            let level = mask.level;
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SplitError::TaskFailed {
                    level,
                    message: e.to_string(),
                })?;

            if failed.load(Ordering::SeqCst) {
                warn!(level, "Skipping remaining pyramids after failure");
                break;
            }

            let encoder = self.encoder.clone();
            let failed = failed.clone();
            let completed = completed.clone();
            let progress = progress.clone();
            let (tile_size, resampling) = (self.min_tile_size, self.resampling);

            let handle = tokio::task::spawn_blocking(move || {
                let result = build_pyramid(&*encoder, &mask, tile_size, resampling);
                match &result {
                    Ok(_) => {
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        progress.advance(Phase::Pyramids, done, total);
                    }
                    Err(_) => failed.store(true, Ordering::SeqCst),
                }
                drop(permit);
                result
            });
            handles.push((level, handle));
        }

        let mut outputs = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for (level, handle) in handles {
            match handle.await {
                Ok(Ok(output)) => outputs.push(output),
                Ok(Err(e)) => {
                    error!(level, error = %e, "Pyramid construction failed");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!(level, error = %e, "Pyramid task panicked");
                    first_error.get_or_insert(SplitError::TaskFailed {
                        level,
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            pyramids = outputs.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Pyramid construction complete"
        );
        Ok(outputs)
    }
}

/// Translate one mask into a container and add its overviews.
pub fn build_pyramid<E: TileEncoder>(
    encoder: &E,
    mask: &MaskDataset,
    min_tile_size: usize,
    resampling: Resampling,
) -> Result<PyramidOutput> {
    let dest = naming::container_path(&mask.path);
    let encode_error = |source| SplitError::Encode {
        path: dest.clone(),
        level: mask.level,
        source,
    };

    let mut container = encoder.translate(&mask.path, &dest).map_err(encode_error)?;

    let factors = plan_overviews(mask.width, mask.height, min_tile_size);
    if !factors.is_empty() {
        container
            .build_overviews(resampling, &factors, &[1])
            .map_err(encode_error)?;
    }
    container.close().map_err(encode_error)?;

    debug!(
        level = mask.level,
        path = %dest.display(),
        overviews = ?factors,
        "Built pyramid"
    );

    Ok(PyramidOutput {
        level: mask.level,
        path: dest,
        overview_factors: factors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::memory::MemoryEncoder;
    use crate::progress::NoProgress;

    fn masks(count: u8, width: usize, height: usize) -> Vec<MaskDataset> {
        (1..=count)
            .map(|level| MaskDataset {
                level,
                path: PathBuf::from(format!("mask_{}.tiff", level)),
                width,
                height,
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrency_is_bounded() {
        let encoder = MemoryEncoder {
            delay: Duration::from_millis(20),
            ..Default::default()
        };
        let state = encoder.state.clone();
        let dispatcher = PyramidDispatcher::new(encoder, 3, 256).unwrap();

        let outputs = dispatcher
            .dispatch(masks(20, 64, 64), Arc::new(NoProgress))
            .await
            .unwrap();

        assert_eq!(outputs.len(), 20);
        assert!(state.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(state.in_flight.load(Ordering::SeqCst), 0);
        // 64x64 fits a tile, no overviews requested
        assert!(state.overviews.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outputs_follow_mask_order() {
        let dispatcher = PyramidDispatcher::new(MemoryEncoder::default(), 2, 256).unwrap();
        let outputs = dispatcher
            .dispatch(masks(4, 600, 700), Arc::new(NoProgress))
            .await
            .unwrap();

        let levels: Vec<u8> = outputs.iter().map(|o| o.level).collect();
        assert_eq!(levels, vec![1, 2, 3, 4]);
        assert_eq!(outputs[0].path, PathBuf::from("mask_1.ptif"));
        assert_eq!(outputs[0].overview_factors, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_failure_stops_admission() {
        let encoder = MemoryEncoder {
            fail_source: Some(PathBuf::from("mask_1.tiff")),
            ..Default::default()
        };
        let state = encoder.state.clone();
        let dispatcher = PyramidDispatcher::new(encoder, 1, 256).unwrap();

        let err = dispatcher
            .dispatch(masks(10, 8, 8), Arc::new(NoProgress))
            .await
            .unwrap_err();

        assert!(matches!(err, SplitError::Encode { level: 1, .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Encoding);
        // With one permit the next mask waits for the failed one to finish
        assert!(state.translated.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(PyramidDispatcher::new(MemoryEncoder::default(), 0, 256).is_err());
    }

    #[test]
    fn test_build_pyramid_plans_overviews() {
        let encoder = MemoryEncoder::default();
        let mask = MaskDataset {
            level: 7,
            path: PathBuf::from("out/mask.tiff"),
            width: 300,
            height: 300,
        };
        let output = build_pyramid(&encoder, &mask, 256, Resampling::Nearest).unwrap();
        assert_eq!(output.path, PathBuf::from("out/mask.ptif"));
        assert_eq!(output.overview_factors, vec![2]);
        assert_eq!(
            encoder.state.overviews.lock().unwrap().clone(),
            vec![(PathBuf::from("out/mask.ptif"), vec![2])]
        );
    }
}
