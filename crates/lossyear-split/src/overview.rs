//! Overview level planning.

/// Tile edge length used to decide when a pyramid is deep enough.
pub const DEFAULT_MIN_TILE_SIZE: usize = 256;

/// Downsampling factors for a `width` x `height` raster.
///
/// Levels are added while the current level is still larger than
/// `tile_size` on both axes; each new level halves the previous one. The
/// coarsest level is therefore the first that fits within a tile along at
/// least one axis. A raster already within `tile_size` on either axis gets
/// no overviews.
///
/// ```
/// use lossyear_split::overview::plan_overviews;
///
/// assert_eq!(plan_overviews(300, 300, 256), vec![2]);
/// assert_eq!(plan_overviews(40000, 40000, 256), vec![2, 4, 8, 16, 32, 64, 128, 256]);
/// assert!(plan_overviews(256, 4000, 256).is_empty());
/// ```
pub fn plan_overviews(width: usize, height: usize, tile_size: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    if tile_size == 0 {
        return factors;
    }

    let mut current = 1usize;
    while width.div_ceil(current) > tile_size && height.div_ceil(current) > tile_size {
        current *= 2;
        factors.push(current);
    }
    factors
}
