pub mod config;

/// Common utilities shared across the transaction pipeline workspace.
///
/// This crate provides functionality used by every executable and test suite:
///
/// - Configuration loading for the backend service
/// - Shared test error/result types

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{TestError, TestResult};
