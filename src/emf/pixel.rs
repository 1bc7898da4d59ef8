//! DIB pixel conversion.
//!
//! Device-independent bitmaps store rows padded to 4-byte boundaries, blue
//! first, and bottom-up unless the height is negative. [`convert`] handles
//! the per-pixel channel work; [`DibImage`] adds validation and row order on
//! top of it and produces the top-down RGBA buffer the rasterizer blits.
//!
//! Only uncompressed 24 and 32 bpp data is supported. The fourth byte of a
//! 32 bpp `BI_RGB` pixel is padding, so alpha is always forced opaque.

use super::records::bitmap::{Dib, compression};
use crate::common::error::{Error, Result};
use tiny_skia::{IntSize, Pixmap};

/// Bytes per DIB row: bits rounded up to a 32-bit boundary
pub fn row_stride(width: u32, bpp: u16) -> Option<usize> {
    let bits = (width as usize).checked_mul(bpp as usize)?;
    Some(bits.checked_add(31)? / 32 * 4)
}

/// Size in bytes of an uncompressed DIB pixel array
pub fn expected_len(width: u32, height: u32, bpp: u16) -> Option<usize> {
    row_stride(width, bpp)?.checked_mul(height as usize)
}

/// Convert padded BGR(X) rows into packed RGB or RGBA rows.
///
/// Rows keep their source order. Supported pairs are 32 → 24, 24 → 24,
/// 32 → 32 and 24 → 32; anything else is [`Error::UnsupportedPixelFormat`].
pub fn convert(
    source: &[u8],
    width: u32,
    height: u32,
    source_bpp: u16,
    target_bpp: u16,
) -> Result<Vec<u8>> {
    let src_px = match source_bpp {
        24 => 3,
        32 => 4,
        other => {
            return Err(Error::UnsupportedPixelFormat(format!(
                "{other} bpp source"
            )));
        },
    };
    let dst_px = match target_bpp {
        24 => 3,
        32 => 4,
        other => {
            return Err(Error::UnsupportedPixelFormat(format!(
                "{other} bpp target"
            )));
        },
    };

    let overflow = || Error::InvalidBitmap(format!("{width}x{height} bitmap is too large"));
    let stride = row_stride(width, source_bpp).ok_or_else(overflow)?;
    let needed = expected_len(width, height, source_bpp).ok_or_else(overflow)?;
    if source.len() < needed {
        return Err(Error::InvalidBitmap(format!(
            "{width}x{height} at {source_bpp} bpp needs {needed} bytes, got {}",
            source.len()
        )));
    }

    let out_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(dst_px))
        .ok_or_else(overflow)?;
    let mut out = Vec::with_capacity(out_len);
    if stride == 0 {
        return Ok(out);
    }
    for row in source[..needed].chunks_exact(stride) {
        for px in row[..width as usize * src_px].chunks_exact(src_px) {
            out.extend_from_slice(&[px[2], px[1], px[0]]);
            if dst_px == 4 {
                out.push(255);
            }
        }
    }
    Ok(out)
}

/// A validated bitmap as top-down, opaque RGBA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DibImage {
    pub width: u32,
    pub height: u32,
    /// Four bytes per pixel, rows top to bottom
    pub rgba: Vec<u8>,
}

impl DibImage {
    /// Validate and normalize a DIB lifted from a record
    pub fn from_dib(dib: &Dib) -> Result<Self> {
        let header = &dib.header;
        if header.compression != compression::BI_RGB {
            return Err(Error::UnsupportedPixelFormat(format!(
                "compression {}",
                header.compression
            )));
        }
        if !matches!(header.bit_count, 24 | 32) {
            return Err(Error::UnsupportedPixelFormat(format!(
                "{} bpp",
                header.bit_count
            )));
        }
        if header.width <= 0 || header.height == 0 {
            return Err(Error::InvalidBitmap(format!(
                "empty bitmap {}x{}",
                header.width, header.height
            )));
        }

        let width = header.width as u32;
        let height = dib.height();
        let mut rgba = convert(&dib.bits, width, height, header.bit_count, 32)?;
        if dib.is_bottom_up() {
            flip_rows(&mut rgba, width as usize * 4);
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// RGBA of a pixel, `None` outside the image
    #[inline]
    pub fn pixel(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ])
    }

    /// Pixmap for pattern fills; opaque data is already premultiplied
    pub fn to_pixmap(&self) -> Result<Pixmap> {
        IntSize::from_wh(self.width, self.height)
            .and_then(|size| Pixmap::from_vec(self.rgba.clone(), size))
            .ok_or_else(|| {
                Error::InvalidBitmap(format!(
                    "cannot build a {}x{} pixmap",
                    self.width, self.height
                ))
            })
    }
}

fn flip_rows(data: &mut [u8], stride: usize) {
    if stride == 0 {
        return;
    }
    let rows = data.len() / stride;
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        let (head, tail) = data.split_at_mut(bottom * stride);
        head[top * stride..(top + 1) * stride].swap_with_slice(&mut tail[..stride]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emf::records::bitmap::BitmapInfoHeader;

    fn dib(width: i32, height: i32, bit_count: u16, compression: u32, bits: Vec<u8>) -> Dib {
        Dib {
            header: BitmapInfoHeader {
                size: 40,
                width,
                height,
                planes: 1,
                bit_count,
                compression,
                size_image: bits.len() as u32,
                x_pels_per_meter: 0,
                y_pels_per_meter: 0,
                clr_used: 0,
                clr_important: 0,
            },
            color_table: Vec::new(),
            bits,
        }
    }

    #[test]
    fn test_bgrx_to_rgb() {
        let out = convert(&[10, 20, 30, 255, 40, 50, 60, 255], 2, 1, 32, 24).unwrap();
        assert_eq!(out, vec![30, 20, 10, 60, 50, 40]);
    }

    #[test]
    fn test_padding_byte_is_not_alpha() {
        let out = convert(&[1, 2, 3, 0], 1, 1, 32, 32).unwrap();
        assert_eq!(out, vec![3, 2, 1, 255]);
    }

    #[test]
    fn test_bgr_rows_are_padded() {
        // One 24-bit pixel per row, padded to 4 bytes
        let source = [1, 2, 3, 0, 4, 5, 6, 0];
        assert_eq!(
            convert(&source, 1, 2, 24, 24).unwrap(),
            vec![3, 2, 1, 6, 5, 4]
        );
        assert_eq!(
            convert(&source, 1, 2, 24, 32).unwrap(),
            vec![3, 2, 1, 255, 6, 5, 4, 255]
        );
    }

    #[test]
    fn test_unsupported_depths() {
        assert!(matches!(
            convert(&[0; 4], 8, 1, 4, 24),
            Err(Error::UnsupportedPixelFormat(_))
        ));
        assert!(matches!(
            convert(&[0; 4], 1, 1, 32, 16),
            Err(Error::UnsupportedPixelFormat(_))
        ));
    }

    #[test]
    fn test_short_source() {
        assert!(matches!(
            convert(&[0; 7], 2, 1, 32, 24),
            Err(Error::InvalidBitmap(_))
        ));
    }

    #[test]
    fn test_expected_len() {
        assert_eq!(expected_len(2, 1, 32), Some(8));
        assert_eq!(expected_len(3, 2, 24), Some(24));
        assert_eq!(expected_len(1, 1, 1), Some(4));
        assert_eq!(expected_len(u32::MAX, u32::MAX, 32), None);
    }

    #[test]
    fn test_bottom_up_rows_flipped() {
        // Stored bottom row first: blue pixel, then red pixel
        let bits = vec![255, 0, 0, 0, 0, 0, 255, 0];
        let image = DibImage::from_dib(&dib(1, 2, 32, compression::BI_RGB, bits.clone())).unwrap();
        assert_eq!(image.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(image.pixel(0, 1), Some([0, 0, 255, 255]));
        assert_eq!(image.pixel(0, 2), None);

        let top_down = DibImage::from_dib(&dib(1, -2, 32, compression::BI_RGB, bits)).unwrap();
        assert_eq!(top_down.pixel(0, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_dib_validation() {
        assert!(matches!(
            DibImage::from_dib(&dib(1, 1, 32, compression::BI_RLE8, vec![0; 4])),
            Err(Error::UnsupportedPixelFormat(_))
        ));
        assert!(matches!(
            DibImage::from_dib(&dib(1, 1, 8, compression::BI_RGB, vec![0; 4])),
            Err(Error::UnsupportedPixelFormat(_))
        ));
        assert!(matches!(
            DibImage::from_dib(&dib(4, 4, 32, compression::BI_RGB, vec![0; 8])),
            Err(Error::InvalidBitmap(_))
        ));
        assert!(matches!(
            DibImage::from_dib(&dib(0, 4, 32, compression::BI_RGB, Vec::new())),
            Err(Error::InvalidBitmap(_))
        ));
    }

    #[test]
    fn test_to_pixmap() {
        let image = DibImage::from_dib(&dib(2, 1, 24, compression::BI_RGB, vec![0, 0, 255, 0, 255, 0, 0, 0])).unwrap();
        let pixmap = image.to_pixmap().unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (2, 1));
        assert_eq!(&pixmap.data()[..4], &[255, 0, 0, 255]);
    }
}
