//! In-memory raster doubles for unit tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use geotiff::{GeoKeys, GeoReference, GeoTiffError, GeoTransform, Resampling};

use crate::raster::{MaskDriver, MaskSink, RasterSource, TileContainer, TileEncoder};

pub fn hansen_georef() -> GeoReference {
    GeoReference::new(
        GeoTransform::north_up(-80.0, 10.0, 0.00025),
        GeoKeys::default(),
    )
}

/// Row-major raster held in a vector.
pub struct MemorySource {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
    pub georef: GeoReference,
    pub fail_at: Option<usize>,
}

impl MemorySource {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
            georef: hansen_georef(),
            fail_at: None,
        }
    }
}

impl RasterSource for MemorySource {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn georeference(&self) -> &GeoReference {
        &self.georef
    }

    fn read_row(&mut self, y: usize, buf: &mut [u8]) -> geotiff::Result<()> {
        if self.fail_at == Some(y) {
            return Err(GeoTiffError::unsupported("injected read failure"));
        }
        buf.copy_from_slice(&self.data[y * self.width..(y + 1) * self.width]);
        Ok(())
    }
}

/// Everything the memory driver saw, in order.
#[derive(Debug, Default)]
pub struct DriverLog {
    pub created: Vec<PathBuf>,
    pub writes: Vec<(PathBuf, usize)>,
    pub closed: Vec<PathBuf>,
    pub rows: BTreeMap<PathBuf, Vec<Vec<u8>>>,
}

/// Mask driver recording every call instead of writing files.
#[derive(Clone, Default)]
pub struct MemoryDriver {
    pub log: Arc<Mutex<DriverLog>>,
    pub fail_write: Option<usize>,
}

impl MemoryDriver {
    pub fn rows_of(&self, path: &Path) -> Vec<Vec<u8>> {
        self.log.lock().unwrap().rows.get(path).cloned().unwrap_or_default()
    }
}

pub struct MemorySink {
    path: PathBuf,
    log: Arc<Mutex<DriverLog>>,
    fail_write: Option<usize>,
}

impl MaskDriver for MemoryDriver {
    type Sink = MemorySink;

    fn create(
        &self,
        path: &Path,
        _width: usize,
        _height: usize,
        _georef: &GeoReference,
    ) -> geotiff::Result<MemorySink> {
        let mut log = self.log.lock().unwrap();
        log.created.push(path.to_path_buf());
        log.rows.insert(path.to_path_buf(), Vec::new());
        Ok(MemorySink {
            path: path.to_path_buf(),
            log: self.log.clone(),
            fail_write: self.fail_write,
        })
    }
}

impl MaskSink for MemorySink {
    fn write_row(&mut self, y: usize, row: &[u8]) -> geotiff::Result<()> {
        if self.fail_write == Some(y) {
            return Err(GeoTiffError::unsupported("injected write failure"));
        }
        let mut log = self.log.lock().unwrap();
        log.writes.push((self.path.clone(), y));
        log.rows
            .entry(self.path.clone())
            .or_default()
            .push(row.to_vec());
        Ok(())
    }

    fn close(self) -> geotiff::Result<()> {
        self.log.lock().unwrap().closed.push(self.path);
        Ok(())
    }
}

/// Counters shared between a [`MemoryEncoder`] and its containers.
#[derive(Debug, Default)]
pub struct EncoderState {
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub translated: Mutex<Vec<PathBuf>>,
    pub overviews: Mutex<Vec<(PathBuf, Vec<usize>)>>,
}

/// Tile encoder that only tracks how it was driven.
#[derive(Clone, Default)]
pub struct MemoryEncoder {
    pub state: Arc<EncoderState>,
    pub delay: Duration,
    pub fail_source: Option<PathBuf>,
}

pub struct MemoryContainer {
    dest: PathBuf,
    state: Arc<EncoderState>,
}

impl TileEncoder for MemoryEncoder {
    type Container = MemoryContainer;

    fn translate(&self, source: &Path, dest: &Path) -> geotiff::Result<MemoryContainer> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        if self.fail_source.as_deref() == Some(source) {
            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(GeoTiffError::unsupported("injected encode failure"));
        }

        self.state
            .translated
            .lock()
            .unwrap()
            .push(source.to_path_buf());
        Ok(MemoryContainer {
            dest: dest.to_path_buf(),
            state: self.state.clone(),
        })
    }
}

impl TileContainer for MemoryContainer {
    fn build_overviews(
        &mut self,
        resampling: Resampling,
        factors: &[usize],
        bands: &[usize],
    ) -> geotiff::Result<()> {
        assert_eq!(resampling, Resampling::Nearest);
        assert_eq!(bands, &[1]);
        self.state
            .overviews
            .lock()
            .unwrap()
            .push((self.dest.clone(), factors.to_vec()));
        Ok(())
    }

    fn close(self) -> geotiff::Result<()> {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
