//! Shared test utilities for the yearsplit workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Test data path helpers and a skip macro for real Hansen tiles
//! - Synthetic lossyear rasters written as GeoTIFFs
//! - Hansen tile georeferencing fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{require_test_file, write_lossyear_tiff};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro to skip a test if the required file is not found.
///
/// Real Hansen tiles are ~1.6 GB of pixels each, far too large to keep in
/// the repository. Tests that want one look it up and return early when it
/// is absent.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_test_file;
///
/// #[test]
/// fn test_real_tile() {
///     let path = require_test_file!("Hansen_GFC-2020-v1.8_lossyear_10N_080W.tif");
///     // Test code using path...
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Download test data or set TEST_DATA_DIR.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Compare two geotransforms coefficient by coefficient.
#[macro_export]
macro_rules! assert_transform_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: [f64; 6] = $left.0;
        let right: [f64; 6] = $right.0;
        for i in 0..6 {
            $crate::assert_approx_eq!(left[i], right[i], $epsilon);
        }
    }};
}
