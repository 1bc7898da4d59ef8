// Enhanced Metafile (EMF) decoder and raster renderer
//
// An EMF file is an ordered list of typed, variable-length records. Parsing
// decodes the whole stream into an immutable `EmfFile`; rendering replays
// those records against a `DeviceContext` that owns the raster.
//
// References:
// - [MS-EMF]: Enhanced Metafile Format Specification
// - https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-emf/

pub mod converter;
pub mod device_context;
pub mod font;
pub mod gdi_objects;
pub mod parser;
pub mod pixel;
pub mod raster;
pub mod record_parser;
pub mod records;

#[cfg(test)]
mod test_support;

pub use converter::{EmfConverter, RenderOptions};
pub use device_context::DeviceContext;
pub use font::{FontResolver, StaticFontResolver};
pub use parser::{EmfFile, EmfHeader};
pub use records::Record;

use crate::common::error::Result;
use image::{ImageFormat, RgbaImage};

/// Decode and render EMF data
///
/// # Example
/// ```no_run
/// use emf_raster::emf::{RenderOptions, render_emf};
///
/// let data = std::fs::read("image.emf")?;
/// let image = render_emf(&data, &RenderOptions::default())?;
/// println!("{}x{}", image.width(), image.height());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn render_emf(emf_data: &[u8], options: &RenderOptions) -> Result<RgbaImage> {
    let file = EmfFile::parse(emf_data)?;
    EmfConverter::new(&file, options.clone()).render()
}

/// Convert EMF data to an encoded image in the specified format
///
/// # Arguments
/// * `emf_data` - Raw EMF file data
/// * `format` - Target image format (PNG, JPEG, WebP)
///
/// # Returns
/// Encoded image bytes in the target format
pub fn convert_emf(emf_data: &[u8], format: ImageFormat) -> Result<Vec<u8>> {
    let file = EmfFile::parse(emf_data)?;
    EmfConverter::new(&file, RenderOptions::default()).convert_to_format(format)
}

/// Convert EMF data to PNG format
pub fn convert_emf_to_png(emf_data: &[u8]) -> Result<Vec<u8>> {
    convert_emf(emf_data, ImageFormat::Png)
}

#[cfg(test)]
mod tests {
    use super::test_support::EmfBuilder;
    use super::*;

    #[test]
    fn test_convert_to_png() {
        let png = convert_emf_to_png(&EmfBuilder::new(0, 0, 4, 2).rectangle(1, 1, 3, 2).finish()).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }

    #[test]
    fn test_decode_errors_are_fatal() {
        let mut data = EmfBuilder::new(0, 0, 4, 4).move_to(1, 1).finish();
        data.truncate(data.len() - 30);
        let err = render_emf(&data, &RenderOptions::default()).unwrap_err();
        assert!(err.is_fatal());
    }
}
