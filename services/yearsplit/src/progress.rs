//! Terminal progress bars.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use lossyear_split::{Phase, ProgressSink};

/// One bar per phase, drawn to stderr.
pub struct BarProgress {
    rows: ProgressBar,
    pyramids: ProgressBar,
}

impl BarProgress {
    pub fn new(height: u64, levels: u64, visible: bool) -> Self {
        let multi = if visible {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let rows = multi.add(ProgressBar::new(height));
        rows.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {percent:>3}% rows {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        let pyramids = multi.add(ProgressBar::new(levels));
        pyramids.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.green/white} pyramids {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        Self { rows, pyramids }
    }

    /// Stop drawing, leaving the final state on screen.
    pub fn finish(&self) {
        self.rows.finish();
        self.pyramids.finish();
    }
}

impl ProgressSink for BarProgress {
    fn advance(&self, phase: Phase, completed: u64, total: u64) {
        let bar = match phase {
            Phase::Rows => &self.rows,
            Phase::Pyramids => &self.pyramids,
        };
        if bar.length() != Some(total) {
            bar.set_length(total);
        }
        // Pyramid tasks report out of order
        if completed > bar.position() {
            bar.set_position(completed);
        }
    }
}
