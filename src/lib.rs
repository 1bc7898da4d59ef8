//! emf-raster - A Rust library for decoding and rasterising Windows Enhanced Metafiles
//!
//! An EMF image is a recorded sequence of GDI drawing calls. This crate decodes
//! that record stream into typed values and replays it onto an RGBA raster.
//!
//! # Features
//!
//! - **Record decoder**: Bounds-checked parsing of every supported record type
//! - **Graphics state**: Mapping modes, world transforms, saved states and clip regions
//! - **Object table**: Pens, brushes, fonts, palettes and regions addressed by handle
//! - **Rasteriser**: Paths, bit-block transfers and TrueType text on a `tiny-skia` pixmap
//! - **Fault tolerance**: Records that cannot be drawn are logged and skipped
//!
//! # Example - Rendering an EMF file
//!
//! ```no_run
//! use emf_raster::emf::{EmfConverter, EmfFile, RenderOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("drawing.emf")?;
//! let file = EmfFile::parse(&data)?;
//! println!("{} records, {:?}", file.records().len(), file.raster_size()?);
//!
//! let options = RenderOptions {
//!     font_dir: Some("/usr/share/fonts/truetype".into()),
//!     ..RenderOptions::default()
//! };
//! let png = EmfConverter::new(&file, options).convert_to_png()?;
//! std::fs::write("drawing.png", png)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - One-shot conversion
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("drawing.emf")?;
//! let png = emf_raster::emf::convert_emf_to_png(&data)?;
//! # Ok(())
//! # }
//! ```

/// Shared byte reading and error types
pub mod common;

/// Enhanced Metafile decoder and renderer
///
/// Decoding produces an immutable [`emf::EmfFile`]; rendering replays it on a
/// [`emf::DeviceContext`].
pub mod emf;

pub use common::{Error, Result};
