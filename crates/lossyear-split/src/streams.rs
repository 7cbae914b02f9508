//! The set of mask datasets written during the row phase.

use std::path::{Path, PathBuf};

use geotiff::GeoReference;
use tracing::{debug, info};

use crate::error::{Result, SplitError};
use crate::mask_rows::MaskRows;
use crate::naming;
use crate::raster::{MaskDriver, MaskSink};
use crate::threshold::ThresholdRange;

/// A closed mask raster, ready to be turned into a pyramid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskDataset {
    pub level: u8,
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
}

struct Stream<S> {
    level: u8,
    path: PathBuf,
    sink: S,
}

/// One open mask sink per threshold level.
///
/// Owns every dataset for the whole row phase. [`MaskStreamSet::close`]
/// consumes the set and hands back [`MaskDataset`]s, which is the only way
/// to get at the outputs once they are written.
pub struct MaskStreamSet<S: MaskSink> {
    streams: Vec<Stream<S>>,
    width: usize,
    height: usize,
    rows_written: usize,
}

impl<S: MaskSink> std::fmt::Debug for MaskStreamSet<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskStreamSet")
            .field("levels", &self.streams.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rows_written", &self.rows_written)
            .finish()
    }
}

impl<S: MaskSink> MaskStreamSet<S> {
    /// Create one dataset per level in `output_dir`.
    ///
    /// Every derived path is checked before the first dataset is created:
    /// if any mask (or, with `with_containers`, any tile container) already
    /// exists, nothing is written and [`SplitError::OutputExists`] is
    /// returned.
    pub fn create<D>(
        driver: &D,
        thresholds: ThresholdRange,
        georef: &GeoReference,
        width: usize,
        height: usize,
        output_dir: &Path,
        with_containers: bool,
    ) -> Result<Self>
    where
        D: MaskDriver<Sink = S>,
    {
        let planned: Vec<(u8, PathBuf)> = thresholds
            .levels()
            .map(|level| (level, naming::mask_path(output_dir, level, &georef.transform)))
            .collect();

        for (_, path) in &planned {
            if path.exists() {
                return Err(SplitError::OutputExists { path: path.clone() });
            }
            let container = naming::container_path(path);
            if with_containers && container.exists() {
                return Err(SplitError::OutputExists { path: container });
            }
        }

        let mut streams = Vec::with_capacity(planned.len());
        for (level, path) in planned {
            let sink = driver
                .create(&path, width, height, georef)
                .map_err(|source| SplitError::Create {
                    path: path.clone(),
                    level,
                    source,
                })?;
            debug!(level, path = %path.display(), "Created mask dataset");
            streams.push(Stream { level, path, sink });
        }

        info!(
            levels = streams.len(),
            width,
            height,
            dir = %output_dir.display(),
            "Created mask datasets"
        );

        Ok(Self {
            streams,
            width,
            height,
            rows_written: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Paths of the datasets, in level order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.streams.iter().map(|s| s.path.as_path())
    }

    /// Write row `y` of every level.
    pub fn write_rows(&mut self, y: usize, rows: &MaskRows) -> Result<()> {
        for (stream, (level, row)) in self.streams.iter_mut().zip(rows.levels()) {
            debug_assert_eq!(stream.level, level);
            stream
                .sink
                .write_row(y, row)
                .map_err(|source| SplitError::Write {
                    path: stream.path.clone(),
                    level: stream.level,
                    row: y,
                    source,
                })?;
        }
        self.rows_written += 1;
        Ok(())
    }

    /// Close every dataset exactly once and release them for phase two.
    pub fn close(self) -> Result<Vec<MaskDataset>> {
        let (width, height) = (self.width, self.height);
        let mut closed = Vec::with_capacity(self.streams.len());

        for Stream { level, path, sink } in self.streams {
            sink.close().map_err(|source| SplitError::Close {
                path: path.clone(),
                level,
                source,
            })?;
            closed.push(MaskDataset {
                level,
                path,
                width,
                height,
            });
        }

        debug!(datasets = closed.len(), "Closed mask datasets");
        Ok(closed)
    }
}
