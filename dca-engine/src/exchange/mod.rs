//! Exchange doubles used by the engine's tests and by downstream crates with
//! the `test-utils` feature.

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
