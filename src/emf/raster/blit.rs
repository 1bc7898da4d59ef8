// Bit-block transfers
//
// Nearest-neighbour copy of a source bitmap onto a device rectangle, combined
// with the destination and the current brush through a ternary raster
// operation. Only the ROP codes listed in `records::bitmap::rop` are known.

use super::Canvas;
use crate::common::error::{Error, Result};
use crate::emf::pixel::DibImage;
use crate::emf::records::bitmap::rop;
use tiny_skia::Mask;

/// The brush as seen by pattern-using raster operations
#[derive(Debug, Clone)]
pub enum BlitPattern {
    Color([u8; 3]),
    Image(DibImage),
}

impl BlitPattern {
    fn sample(&self, x: u32, y: u32) -> [u8; 3] {
        match self {
            BlitPattern::Color(rgb) => *rgb,
            BlitPattern::Image(image) => {
                let px = image
                    .pixel((x % image.width) as i64, (y % image.height) as i64)
                    .unwrap_or([0, 0, 0, 255]);
                [px[0], px[1], px[2]]
            },
        }
    }
}

/// Source rectangle in bitmap pixels; negative extents mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: i32,
    pub y: i32,
    pub cx: i32,
    pub cy: i32,
}

/// Destination corners in device space; reversed corners mirror
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Whether a raster operation reads the source bitmap
pub fn uses_source(code: u32) -> bool {
    !matches!(
        code,
        rop::PATCOPY | rop::PATINVERT | rop::DSTINVERT | rop::BLACKNESS | rop::WHITENESS
    )
}

/// Whether a raster operation reads the current brush
pub fn uses_pattern(code: u32) -> bool {
    matches!(code, rop::MERGECOPY | rop::PATCOPY | rop::PATINVERT)
}

/// Per-channel combiner of source, destination and pattern
type RopFn = fn(u8, u8, u8) -> u8;

/// Channel combiner for a raster operation; `None` for unknown operations
fn rop_fn(code: u32) -> Option<RopFn> {
    let op: RopFn = match code {
        rop::SRCCOPY => |s, _, _| s,
        rop::SRCPAINT => |s, d, _| s | d,
        rop::SRCAND => |s, d, _| s & d,
        rop::SRCINVERT => |s, d, _| s ^ d,
        rop::SRCERASE => |s, d, _| s & !d,
        rop::NOTSRCCOPY => |s, _, _| !s,
        rop::NOTSRCERASE => |s, d, _| !(s | d),
        rop::MERGECOPY => |s, _, p| s & p,
        rop::MERGEPAINT => |s, d, _| !s | d,
        rop::PATCOPY => |_, _, p| p,
        rop::PATINVERT => |_, d, p| p ^ d,
        rop::DSTINVERT => |_, d, _| !d,
        rop::BLACKNESS => |_, _, _| 0,
        rop::WHITENESS => |_, _, _| 255,
        _ => return None,
    };
    Some(op)
}

/// Map a fraction of the destination extent to a source coordinate
#[inline]
fn source_coord(origin: i32, extent: i32, t: f32) -> i64 {
    let step = (t * extent.unsigned_abs() as f32).floor() as i64;
    if extent >= 0 {
        origin as i64 + step
    } else {
        origin as i64 - 1 - step
    }
}

/// Transfer `source` into `dest` on the canvas.
///
/// Returns the number of pixels written.
pub fn blit(
    canvas: &mut Canvas,
    source: Option<&DibImage>,
    src: SourceRect,
    dest: DestRect,
    code: u32,
    pattern: &BlitPattern,
    clip: Option<&Mask>,
) -> Result<usize> {
    let Some(op) = rop_fn(code) else {
        return Err(Error::Drawing(format!(
            "unsupported raster operation 0x{code:08X}"
        )));
    };
    let source = match source {
        Some(image) => Some(image),
        None if uses_source(code) => {
            return Err(Error::InvalidBitmap(format!(
                "raster operation 0x{code:08X} needs a source bitmap"
            )));
        },
        None => None,
    };

    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let (dx, dy) = (dest.x1 - dest.x0, dest.y1 - dest.y0);
    if dx == 0.0 || dy == 0.0 {
        return Ok(0);
    }
    let left = (dest.x0.min(dest.x1).round() as i64).clamp(0, width);
    let right = (dest.x0.max(dest.x1).round() as i64).clamp(0, width);
    let top = (dest.y0.min(dest.y1).round() as i64).clamp(0, height);
    let bottom = (dest.y0.max(dest.y1).round() as i64).clamp(0, height);

    let mask = clip.map(Mask::data);
    let data = canvas.pixmap_mut().data_mut();
    let mut written = 0;
    for py in top..bottom {
        let ty = ((py as f32 + 0.5 - dest.y0) / dy).clamp(0.0, 0.999_999);
        let sy = source_coord(src.y, src.cy, ty);
        for px in left..right {
            let index = (py * width + px) as usize;
            if mask.is_some_and(|m| m[index] == 0) {
                continue;
            }
            let s = match source {
                Some(image) => {
                    let tx = ((px as f32 + 0.5 - dest.x0) / dx).clamp(0.0, 0.999_999);
                    match image.pixel(source_coord(src.x, src.cx, tx), sy) {
                        Some(rgba) => [rgba[0], rgba[1], rgba[2]],
                        None => continue,
                    }
                },
                None => [0, 0, 0],
            };
            let p = pattern.sample(px as u32, py as u32);
            let i = index * 4;
            for channel in 0..3 {
                data[i + channel] = op(s[channel], data[i + channel], p[channel]);
            }
            data[i + 3] = 255;
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emf::records::types::ColorRef;

    fn image(width: u32, height: u32, pixels: &[[u8; 3]]) -> DibImage {
        DibImage {
            width,
            height,
            rgba: pixels.iter().flat_map(|p| [p[0], p[1], p[2], 255]).collect(),
        }
    }

    fn pixel(canvas: &Canvas, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * canvas.width() + x) * 4) as usize;
        let d = canvas.pixmap().data();
        [d[i], d[i + 1], d[i + 2]]
    }

    const NO_PATTERN: BlitPattern = BlitPattern::Color([0, 0, 0]);

    fn full(cx: i32, cy: i32) -> SourceRect {
        SourceRect { x: 0, y: 0, cx, cy }
    }

    #[test]
    fn test_srccopy_stretch() {
        let mut canvas = Canvas::new(4, 2, ColorRef::WHITE, false).unwrap();
        let src = image(2, 1, &[[255, 0, 0], [0, 0, 255]]);
        let dest = DestRect { x0: 0.0, y0: 0.0, x1: 4.0, y1: 2.0 };
        let written = blit(&mut canvas, Some(&src), full(2, 1), dest, rop::SRCCOPY, &NO_PATTERN, None).unwrap();
        assert_eq!(written, 8);
        assert_eq!(pixel(&canvas, 0, 0), [255, 0, 0]);
        assert_eq!(pixel(&canvas, 1, 1), [255, 0, 0]);
        assert_eq!(pixel(&canvas, 2, 0), [0, 0, 255]);
        assert_eq!(pixel(&canvas, 3, 1), [0, 0, 255]);
    }

    #[test]
    fn test_mirrored_destination() {
        let mut canvas = Canvas::new(2, 1, ColorRef::WHITE, false).unwrap();
        let src = image(2, 1, &[[255, 0, 0], [0, 0, 255]]);
        let dest = DestRect { x0: 2.0, y0: 0.0, x1: 0.0, y1: 1.0 };
        blit(&mut canvas, Some(&src), full(2, 1), dest, rop::SRCCOPY, &NO_PATTERN, None).unwrap();
        assert_eq!(pixel(&canvas, 0, 0), [0, 0, 255]);
        assert_eq!(pixel(&canvas, 1, 0), [255, 0, 0]);
    }

    #[test]
    fn test_mirrored_source() {
        let mut canvas = Canvas::new(2, 1, ColorRef::WHITE, false).unwrap();
        let src = image(2, 1, &[[255, 0, 0], [0, 0, 255]]);
        let dest = DestRect { x0: 0.0, y0: 0.0, x1: 2.0, y1: 1.0 };
        let mirrored = SourceRect { x: 2, y: 0, cx: -2, cy: 1 };
        blit(&mut canvas, Some(&src), mirrored, dest, rop::SRCCOPY, &NO_PATTERN, None).unwrap();
        assert_eq!(pixel(&canvas, 0, 0), [0, 0, 255]);
        assert_eq!(pixel(&canvas, 1, 0), [255, 0, 0]);
    }

    #[test]
    fn test_rops_combine_with_destination() {
        let dest = DestRect { x0: 0.0, y0: 0.0, x1: 1.0, y1: 1.0 };
        let src = image(1, 1, &[[0x0F, 0xF0, 0xFF]]);
        let run = |code| {
            let mut canvas = Canvas::new(1, 1, ColorRef::from_rgb(0x33, 0x33, 0x00), false).unwrap();
            blit(&mut canvas, Some(&src), full(1, 1), dest, code, &BlitPattern::Color([1, 2, 3]), None).unwrap();
            pixel(&canvas, 0, 0)
        };
        assert_eq!(run(rop::SRCPAINT), [0x3F, 0xF3, 0xFF]);
        assert_eq!(run(rop::SRCAND), [0x03, 0x30, 0x00]);
        assert_eq!(run(rop::SRCINVERT), [0x3C, 0xC3, 0xFF]);
        assert_eq!(run(rop::NOTSRCCOPY), [0xF0, 0x0F, 0x00]);
        assert_eq!(run(rop::DSTINVERT), [0xCC, 0xCC, 0xFF]);
        assert_eq!(run(rop::PATCOPY), [1, 2, 3]);
        assert_eq!(run(rop::BLACKNESS), [0, 0, 0]);
        assert_eq!(run(rop::WHITENESS), [255, 255, 255]);
    }

    #[test]
    fn test_pattern_ops_need_no_source() {
        let mut canvas = Canvas::new(2, 2, ColorRef::WHITE, false).unwrap();
        let dest = DestRect { x0: 0.0, y0: 0.0, x1: 2.0, y1: 2.0 };
        let written = blit(&mut canvas, None, full(0, 0), dest, rop::BLACKNESS, &NO_PATTERN, None).unwrap();
        assert_eq!(written, 4);
        assert!(matches!(
            blit(&mut canvas, None, full(1, 1), dest, rop::SRCCOPY, &NO_PATTERN, None),
            Err(Error::InvalidBitmap(_))
        ));
    }

    #[test]
    fn test_unknown_rop() {
        let mut canvas = Canvas::new(1, 1, ColorRef::WHITE, false).unwrap();
        let dest = DestRect { x0: 0.0, y0: 0.0, x1: 1.0, y1: 1.0 };
        assert!(matches!(
            blit(&mut canvas, None, full(1, 1), dest, 0x00123456, &NO_PATTERN, None),
            Err(Error::Drawing(_))
        ));
    }

    #[test]
    fn test_clipped_and_offscreen() {
        let mut canvas = Canvas::new(2, 2, ColorRef::WHITE, false).unwrap();
        let mut clip = Mask::new(2, 2).unwrap();
        clip.data_mut()[0] = 255;
        let dest = DestRect { x0: -5.0, y0: -5.0, x1: 5.0, y1: 5.0 };
        let written = blit(&mut canvas, None, full(0, 0), dest, rop::BLACKNESS, &NO_PATTERN, Some(&clip)).unwrap();
        assert_eq!(written, 1);
        assert_eq!(pixel(&canvas, 0, 0), [0, 0, 0]);
        assert_eq!(pixel(&canvas, 1, 1), [255, 255, 255]);
    }
}
