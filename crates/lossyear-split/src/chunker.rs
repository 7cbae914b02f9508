//! Partitioning of a row into per-worker segments.

use std::ops::Range;

use crate::error::{Result, SplitError};

/// Contiguous, non-overlapping index ranges covering `[0, width)`.
///
/// Every worker gets `width / workers` pixels; the remainder goes to the
/// last segment. With `width < workers` the leading segments are empty.
/// The ranges can only be built by [`RowChunks::new`], so code handing out
/// sub-slices can rely on them tiling the row exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowChunks {
    width: usize,
    ranges: Vec<Range<usize>>,
}

impl RowChunks {
    pub fn new(width: usize, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(SplitError::invalid_config("worker count must be >= 1"));
        }

        let base = width / workers;
        let ranges = (0..workers)
            .map(|i| {
                let start = i * base;
                let end = if i + 1 == workers { width } else { start + base };
                start..end
            })
            .collect();

        Ok(Self { width, ranges })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Always false; there is at least one worker.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(chunks: &RowChunks, width: usize) {
        let mut next = 0;
        for range in chunks.ranges() {
            assert_eq!(range.start, next, "gap or overlap at {}", next);
            assert!(range.end >= range.start);
            next = range.end;
        }
        assert_eq!(next, width);
    }

    #[test]
    fn test_remainder_goes_to_last_chunk() {
        let chunks = RowChunks::new(10, 4).unwrap();
        assert_eq!(chunks.ranges(), &[0..2, 2..4, 4..6, 6..10]);
    }

    #[test]
    fn test_single_worker() {
        let chunks = RowChunks::new(40000, 1).unwrap();
        assert_eq!(chunks.ranges(), &[0..40000]);
    }

    #[test]
    fn test_more_workers_than_pixels() {
        let chunks = RowChunks::new(3, 8).unwrap();
        assert_eq!(chunks.len(), 8);
        assert_tiles(&chunks, 3);
        assert_eq!(chunks.ranges()[7], 0..3);
        assert!(chunks.ranges()[..7].iter().all(|r| r.is_empty()));
    }

    #[test]
    fn test_coverage_for_many_shapes() {
        for width in 0..200 {
            for workers in 1..17 {
                let chunks = RowChunks::new(width, workers).unwrap();
                assert_eq!(chunks.len(), workers);
                assert_tiles(&chunks, width);
            }
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(RowChunks::new(10, 0).is_err());
    }
}
