//! Shared test utilities for the snapshot-viz workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Test data path helpers
//! - Skip macros for optional test data
//! - Synthetic plotfile generators
//! - Field catalog fixtures
//! - Mock loader and drawer collaborators
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
//! use test_utils::{fixtures, CountingDrawer, PlotfileBuilder};
//! ```

pub mod fixtures;
pub mod generators;
pub mod mocks;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use mocks::*;
pub use paths::*;

/// Macro to skip a test if the required snapshot is not found.
///
/// Real plotfiles are large and not checked in; tests that need one look it
/// up through [`find_test_file`] and are skipped when it is absent.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_test_file;
///
/// #[test]
/// fn test_real_plotfile() {
///     let path = require_test_file!("plt00000");
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
                    "SKIPPED: Test data '{}' not found. Set VIZ_TEST_DATA_DIR to enable.",
                    $name
                );
                return;
            }
        }
    }};
}
