//! Shared test utilities for the climate indicator workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic daily cube generators
//! - An in-memory [`MockGridSource`] that records what was fetched
//! - Indicator definition fixtures and temporary directories
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
//! use test_utils::{uniform_cube, MockGridSource};
//! ```

pub mod fixtures;
pub mod generators;
pub mod mock_source;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use mock_source::MockGridSource;

/// Install a tracing subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
