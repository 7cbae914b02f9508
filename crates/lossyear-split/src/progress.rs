//! Progress reporting hooks.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// Which stage of a run is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Source rows split into masks.
    Rows,
    /// Mask datasets encoded as pyramids.
    Pyramids,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rows => "rows",
            Self::Pyramids => "pyramids",
        }
    }
}

/// Receives progress updates. Called from worker threads.
pub trait ProgressSink: Send + Sync {
    /// `completed` of `total` units of `phase` are done.
    fn advance(&self, phase: Phase, completed: u64, total: u64);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&self, _phase: Phase, _completed: u64, _total: u64) {}
}

/// Logs progress through `tracing` every tenth of a phase.
#[derive(Debug, Default)]
pub struct LogProgress {
    last_rows_decile: AtomicU64,
    last_pyramids_decile: AtomicU64,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for LogProgress {
    fn advance(&self, phase: Phase, completed: u64, total: u64) {
        if total == 0 {
            return;
        }
        let decile = completed * 10 / total;
        let last = match phase {
            Phase::Rows => &self.last_rows_decile,
            Phase::Pyramids => &self.last_pyramids_decile,
        };
        if last.fetch_max(decile, Ordering::Relaxed) < decile {
            info!(
                phase = phase.as_str(),
                progress = format!("{}/{}", completed, total),
                percent = format!("{:.1}", percent(completed, total)),
                "Progress"
            );
        }
    }
}

/// Completion percentage.
pub fn percent(completed: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}
