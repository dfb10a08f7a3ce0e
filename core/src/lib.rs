//! Portable JSON encoding of typed, strided n-dimensional arrays.
//!
//! Arrays keep their element type, shape and memory order across a round
//! trip, and views keep sharing storage with their base when both are encoded
//! in one call.

pub mod array;
pub mod codec;
pub mod compression;
pub mod dtype;
pub mod errors;
pub mod graph;
pub mod text;

pub use errors::{Error, Result};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_view_encoding() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
