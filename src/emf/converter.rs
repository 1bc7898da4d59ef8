// EMF to raster image converter
//
// Plays a decoded metafile onto a fresh device context and hands back the
// raster, or encodes it into PNG, JPEG, WebP and the other formats the
// `image` crate writes.

use super::device_context::DeviceContext;
use super::font::{FontResolver, StaticFontResolver};
use super::parser::EmfFile;
use crate::common::error::{Error, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Options for EMF to raster conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Colour the raster starts with, as RGB
    pub background: [u8; 3],
    /// Anti-alias paths and glyphs
    pub anti_alias: bool,
    /// Directory font files are loaded from; text is skipped without one
    pub font_dir: Option<PathBuf>,
    /// Largest accepted raster side in pixels
    pub max_dimension: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: [255, 255, 255],
            anti_alias: true,
            font_dir: None,
            max_dimension: 16384,
        }
    }
}

/// EMF to raster converter
///
/// Borrows a decoded file, so several converters can render the same file
/// at once, each with its own device context.
pub struct EmfConverter<'a> {
    file: &'a EmfFile,
    options: RenderOptions,
    resolver: Arc<dyn FontResolver>,
}

impl<'a> EmfConverter<'a> {
    /// Create a converter using the default font table
    pub fn new(file: &'a EmfFile, options: RenderOptions) -> Self {
        Self {
            file,
            options,
            resolver: Arc::new(StaticFontResolver::default()),
        }
    }

    /// Replace the font resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn FontResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Render every record in order.
    ///
    /// Drawing errors are logged and the record is skipped; only errors that
    /// make the raster itself unusable end the render.
    pub fn render(&self) -> Result<RgbaImage> {
        let dc = DeviceContext::new(self.file.header(), &self.options, Arc::clone(&self.resolver))?;
        let mut skipped = 0usize;
        let dc = self.file.iter().try_fold(dc, |mut dc, record| {
            match dc.apply(record) {
                Ok(()) => {},
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    skipped += 1;
                    warn!(record = record.name(), error = %err, "record skipped");
                },
            }
            Ok::<_, Error>(dc)
        })?;
        debug!(records = self.file.records().len(), skipped, "rendered EMF");
        dc.finish()
    }

    /// Render and encode in `format`
    pub fn convert_to_format(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let image = DynamicImage::ImageRgba8(self.render()?);
        // JPEG has no alpha channel
        let image = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(image.to_rgb8())
        } else {
            image
        };

        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format)?;
        Ok(buffer.into_inner())
    }

    /// Render and encode as PNG
    pub fn convert_to_png(&self) -> Result<Vec<u8>> {
        self.convert_to_format(ImageFormat::Png)
    }
}
