//! Cumulative threshold masks.
//!
//! A lossyear pixel holds the year in which loss was detected (1 = 2001,
//! 2 = 2002, ...) or 0 for no loss. The mask for level `L` marks every pixel
//! lost in any year up to and including `L`, so masks grow monotonically
//! with the level: once a pixel is set at some level it stays set at every
//! higher one.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};

/// Mask value for pixels inside the threshold.
pub const MASK_SET: u8 = 255;
/// Mask value for pixels outside the threshold.
pub const MASK_CLEAR: u8 = 0;

/// Mask value of `value` at threshold `level`.
///
/// Set iff `min_level <= value <= level`.
#[inline(always)]
pub fn mask(value: u8, level: u8, min_level: u8) -> u8 {
    if min_level <= value && value <= level {
        MASK_SET
    } else {
        MASK_CLEAR
    }
}

/// Inclusive range of threshold levels, one output dataset per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRange {
    min: u8,
    max: u8,
}

impl ThresholdRange {
    /// Create a range; requires `1 <= min <= max`.
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if min == 0 {
            return Err(SplitError::invalid_config("minimum level must be >= 1"));
        }
        if max < min {
            return Err(SplitError::invalid_config(format!(
                "maximum level {} is below minimum level {}",
                max, min
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Number of levels (and output datasets).
    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    /// Always false; a valid range holds at least one level.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn levels(&self) -> RangeInclusive<u8> {
        self.min..=self.max
    }

    /// Compute one mask value per level for `pixels`, writing into the
    /// matching `outputs` slice (one per level, in level order).
    pub fn apply(&self, pixels: &[u8], outputs: &mut [&mut [u8]]) {
        debug_assert_eq!(outputs.len(), self.len());
        for (level, out) in self.levels().zip(outputs.iter_mut()) {
            for (dst, &value) in out.iter_mut().zip(pixels) {
                *dst = mask(value, level, self.min);
            }
        }
    }
}

impl Default for ThresholdRange {
    /// Hansen GFC lossyear coding: 2001 through 2020.
    fn default() -> Self {
        Self { min: 1, max: 20 }
    }
}
