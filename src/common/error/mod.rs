//! Unified error types for the metafile decoder and renderer.

// Submodule declarations
pub mod types;

// Re-exports
pub use types::{Error, Result};
