//! Per-level row buffers shared by the row workers.
//!
//! During a row, each worker needs write access to the same index range of
//! every level buffer. Instead of sharing the buffers, [`MaskRows`] splits
//! each one along the [`RowChunks`] boundaries and hands every worker a
//! [`ChunkView`] that exclusively borrows its slices. The borrow checker
//! then guarantees no two workers touch the same pixel.

use std::ops::Range;

use crate::chunker::RowChunks;
use crate::threshold::ThresholdRange;

/// One row of mask values per threshold level.
#[derive(Debug)]
pub struct MaskRows {
    thresholds: ThresholdRange,
    buffers: Vec<Vec<u8>>,
}

impl MaskRows {
    pub fn new(thresholds: ThresholdRange, width: usize) -> Self {
        Self {
            thresholds,
            buffers: vec![vec![0; width]; thresholds.len()],
        }
    }

    pub fn thresholds(&self) -> ThresholdRange {
        self.thresholds
    }

    /// Iterate `(level, row)` pairs in level order.
    pub fn levels(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.thresholds
            .levels()
            .zip(self.buffers.iter().map(Vec::as_slice))
    }

    /// Split every level buffer into one exclusive view per chunk.
    pub fn disjoint_views(&mut self, chunks: &RowChunks) -> Vec<ChunkView<'_>> {
        let levels = self.buffers.len();
        let mut views: Vec<ChunkView<'_>> = chunks
            .ranges()
            .iter()
            .map(|range| ChunkView {
                range: range.clone(),
                thresholds: self.thresholds,
                outputs: Vec::with_capacity(levels),
            })
            .collect();

        for buffer in self.buffers.iter_mut() {
            debug_assert_eq!(buffer.len(), chunks.width());
            let mut rest: &mut [u8] = buffer.as_mut_slice();
            for view in views.iter_mut() {
                let (head, tail) = std::mem::take(&mut rest).split_at_mut(view.range.len());
                view.outputs.push(head);
                rest = tail;
            }
        }

        views
    }
}

/// A worker's exclusive slice of every level buffer.
#[derive(Debug)]
pub struct ChunkView<'a> {
    range: Range<usize>,
    thresholds: ThresholdRange,
    outputs: Vec<&'a mut [u8]>,
}

impl ChunkView<'_> {
    /// Pixel indices this view covers.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Compute every level's mask for this view's part of `row`.
    pub fn fill(&mut self, row: &[u8]) {
        let pixels = &row[self.range.clone()];
        self.thresholds.apply(pixels, &mut self.outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_cover_each_level() {
        let thresholds = ThresholdRange::new(1, 3).unwrap();
        let chunks = RowChunks::new(5, 2).unwrap();
        let mut rows = MaskRows::new(thresholds, 5);

        let row = [0u8, 1, 2, 3, 4];
        for mut view in rows.disjoint_views(&chunks) {
            view.fill(&row);
        }

        let levels: Vec<(u8, Vec<u8>)> = rows.levels().map(|(l, r)| (l, r.to_vec())).collect();
        assert_eq!(
            levels,
            vec![
                (1, vec![0, 255, 0, 0, 0]),
                (2, vec![0, 255, 255, 0, 0]),
                (3, vec![0, 255, 255, 255, 0]),
            ]
        );
    }

    #[test]
    fn test_view_ranges_match_chunks() {
        let thresholds = ThresholdRange::new(2, 4).unwrap();
        let chunks = RowChunks::new(11, 3).unwrap();
        let mut rows = MaskRows::new(thresholds, 11);
        let views = rows.disjoint_views(&chunks);
        let ranges: Vec<_> = views.iter().map(ChunkView::range).collect();
        assert_eq!(ranges, chunks.ranges());
        assert!(views.iter().all(|v| v.outputs.len() == 3));
    }

    #[test]
    fn test_empty_chunks_tolerated() {
        let thresholds = ThresholdRange::new(1, 2).unwrap();
        let chunks = RowChunks::new(2, 6).unwrap();
        let mut rows = MaskRows::new(thresholds, 2);
        for mut view in rows.disjoint_views(&chunks) {
            view.fill(&[2, 1]);
        }
        let levels: Vec<Vec<u8>> = rows.levels().map(|(_, r)| r.to_vec()).collect();
        assert_eq!(levels, vec![vec![0, 255], vec![255, 255]]);
    }
}
