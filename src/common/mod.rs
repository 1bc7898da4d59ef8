//! Shared building blocks used by the metafile decoder and renderer.
//!
//! - [`binary`]: bounds-checked little-endian reading
//! - [`error`]: the crate-wide error type and its severity split

pub mod binary;
pub mod error;

pub use binary::ByteCursor;
pub use error::{Error, Result};
