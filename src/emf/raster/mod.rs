// Raster target for EMF playback
//
// `Canvas` wraps the tiny-skia pixmap the device context draws into. All
// coordinates here are device pixels; logical-to-device mapping happens in
// the device context before anything reaches this module.

pub mod blit;
pub mod text;

use super::records::types::ColorRef;
use crate::common::error::{Error, Result};
use image::RgbaImage;
use tiny_skia::{
    FillRule, FilterQuality, Mask, Paint, Path, PathBuilder, Pattern, Pixmap, Rect, SpreadMode,
    Stroke, Transform,
};

/// Device-space point
pub type DevicePoint = (f32, f32);

/// The output raster plus its drawing settings
#[derive(Debug, Clone)]
pub struct Canvas {
    pixmap: Pixmap,
    anti_alias: bool,
}

impl Canvas {
    /// Create a canvas filled with an opaque background
    pub fn new(width: u32, height: u32, background: ColorRef, anti_alias: bool) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or(Error::InvalidRasterSize {
            width: width as i64,
            height: height as i64,
        })?;
        pixmap.fill(background.to_skia());
        Ok(Self { pixmap, anti_alias })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Paint with a solid colour
    pub fn solid_paint(&self, color: ColorRef) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = self.anti_alias;
        paint
    }

    /// Paint tiling `pattern` from the device origin
    pub fn pattern_paint<'a>(&self, pattern: &'a Pixmap) -> Paint<'a> {
        Paint {
            shader: Pattern::new(
                pattern.as_ref(),
                SpreadMode::Repeat,
                FilterQuality::Nearest,
                1.0,
                Transform::identity(),
            ),
            anti_alias: self.anti_alias,
            ..Paint::default()
        }
    }

    pub fn fill_path(&mut self, path: &Path, paint: &Paint<'_>, rule: FillRule, clip: Option<&Mask>) {
        self.pixmap
            .fill_path(path, paint, rule, Transform::identity(), clip);
    }

    pub fn fill_path_transformed(
        &mut self,
        path: &Path,
        paint: &Paint<'_>,
        transform: Transform,
        clip: Option<&Mask>,
    ) {
        self.pixmap
            .fill_path(path, paint, FillRule::Winding, transform, clip);
    }

    pub fn stroke_path(&mut self, path: &Path, paint: &Paint<'_>, stroke: &Stroke, clip: Option<&Mask>) {
        self.pixmap
            .stroke_path(path, paint, stroke, Transform::identity(), clip);
    }

    /// Set one pixel, ignoring positions outside the raster or the clip
    pub fn set_pixel(&mut self, x: i64, y: i64, color: ColorRef, clip: Option<&Mask>) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let index = y as usize * self.width() as usize + x as usize;
        if clip.is_some_and(|mask| mask.data()[index] == 0) {
            return;
        }
        let i = index * 4;
        self.pixmap.data_mut()[i..i + 4].copy_from_slice(&[color.r(), color.g(), color.b(), 255]);
    }

    /// Finish drawing and hand back the raster
    pub fn into_image(self) -> Result<RgbaImage> {
        let (width, height) = (self.width(), self.height());
        let data: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|px| {
                let c = px.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        RgbaImage::from_raw(width, height, data).ok_or(Error::InvalidRasterSize {
            width: width as i64,
            height: height as i64,
        })
    }
}

// Paths

/// Open or closed polyline through device points
pub fn polyline_path(points: &[DevicePoint], close: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.0, first.1);
    for &(x, y) in rest {
        pb.line_to(x, y);
    }
    if close {
        pb.close();
    }
    pb.finish()
}

/// Several polylines in one path, for poly-poly records
pub fn multi_polyline_path<'a>(
    figures: impl IntoIterator<Item = &'a [DevicePoint]>,
    close: bool,
) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for figure in figures {
        let Some((first, rest)) = figure.split_first() else {
            continue;
        };
        pb.move_to(first.0, first.1);
        for &(x, y) in rest {
            pb.line_to(x, y);
        }
        if close {
            pb.close();
        }
    }
    pb.finish()
}

/// Cubic Bézier chain; `start` is the first anchor, then three points per segment
pub fn bezier_path(start: DevicePoint, segments: &[DevicePoint]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(start.0, start.1);
    for chunk in segments.chunks_exact(3) {
        pb.cubic_to(chunk[0].0, chunk[0].1, chunk[1].0, chunk[1].1, chunk[2].0, chunk[2].1);
    }
    pb.finish()
}

/// Axis-aligned rectangle between two device corners, any order
pub fn device_rect(a: DevicePoint, b: DevicePoint) -> Option<Rect> {
    if ![a.0, a.1, b.0, b.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    Rect::from_ltrb(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
}

pub fn ellipse_path(a: DevicePoint, b: DevicePoint) -> Option<Path> {
    device_rect(a, b).and_then(PathBuilder::from_oval)
}

// Clipping
//
// A clip is `Option<Mask>`: `None` means everything is visible. Masks are
// built without anti-aliasing so combinations stay binary.

/// How a new area combines with the current clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    Intersect,
    Union,
    Xor,
    /// Current clip minus the new area
    Difference,
    Replace,
}

/// Mask covering the given path
pub fn path_mask(width: u32, height: u32, path: &Path) -> Option<Mask> {
    let mut mask = Mask::new(width, height)?;
    mask.fill_path(path, FillRule::Winding, false, Transform::identity());
    Some(mask)
}

/// Combine `area` into `clip` with `op`
pub fn combine_clip(clip: Option<Mask>, area: Mask, op: ClipOp) -> Option<Mask> {
    let Some(mut current) = clip else {
        // No clip means the whole raster
        return match op {
            ClipOp::Intersect | ClipOp::Replace => Some(area),
            ClipOp::Union => None,
            ClipOp::Xor | ClipOp::Difference => Some(inverted(area)),
        };
    };
    if op == ClipOp::Replace {
        return Some(area);
    }
    for (dst, &src) in current.data_mut().iter_mut().zip(area.data()) {
        let (a, b) = (*dst != 0, src != 0);
        let keep = match op {
            ClipOp::Intersect => a && b,
            ClipOp::Union => a || b,
            ClipOp::Xor => a != b,
            ClipOp::Difference => a && !b,
            ClipOp::Replace => b,
        };
        *dst = if keep { 255 } else { 0 };
    }
    Some(current)
}

fn inverted(mut mask: Mask) -> Mask {
    for value in mask.data_mut() {
        *value = if *value == 0 { 255 } else { 0 };
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_mask(l: f32, t: f32, r: f32, b: f32) -> Mask {
        let rect = device_rect((l, t), (r, b)).unwrap();
        path_mask(4, 4, &PathBuilder::from_rect(rect)).unwrap()
    }

    fn covered(mask: &Option<Mask>, x: usize, y: usize) -> bool {
        mask.as_ref().is_none_or(|m| m.data()[y * 4 + x] != 0)
    }

    #[test]
    fn test_canvas_background() {
        let canvas = Canvas::new(3, 2, ColorRef::from_rgb(10, 20, 30), true).unwrap();
        let image = canvas.into_image().unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_zero_size_canvas() {
        assert!(matches!(
            Canvas::new(0, 5, ColorRef::WHITE, true),
            Err(Error::InvalidRasterSize { .. })
        ));
    }

    #[test]
    fn test_set_pixel_respects_bounds_and_clip() {
        let mut canvas = Canvas::new(4, 4, ColorRef::WHITE, false).unwrap();
        let clip = rect_mask(0.0, 0.0, 2.0, 4.0);
        canvas.set_pixel(1, 1, ColorRef::BLACK, Some(&clip));
        canvas.set_pixel(3, 1, ColorRef::BLACK, Some(&clip));
        canvas.set_pixel(-1, 9, ColorRef::BLACK, None);
        let image = canvas.into_image().unwrap();
        assert_eq!(image.get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(3, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_clip_combinations() {
        let left = rect_mask(0.0, 0.0, 2.0, 4.0);
        let top = rect_mask(0.0, 0.0, 4.0, 2.0);

        let both = combine_clip(Some(left.clone()), top.clone(), ClipOp::Intersect);
        assert!(covered(&both, 0, 0));
        assert!(!covered(&both, 3, 0));
        assert!(!covered(&both, 0, 3));

        let either = combine_clip(Some(left.clone()), top.clone(), ClipOp::Union);
        assert!(covered(&either, 3, 0));
        assert!(!covered(&either, 3, 3));

        let xor = combine_clip(Some(left.clone()), top.clone(), ClipOp::Xor);
        assert!(!covered(&xor, 0, 0));
        assert!(covered(&xor, 3, 0));

        let diff = combine_clip(Some(left), top.clone(), ClipOp::Difference);
        assert!(!covered(&diff, 0, 0));
        assert!(covered(&diff, 0, 3));

        // Excluding from an unclipped raster
        let excluded = combine_clip(None, top.clone(), ClipOp::Difference);
        assert!(!covered(&excluded, 0, 0));
        assert!(covered(&excluded, 0, 3));

        assert!(combine_clip(None, top, ClipOp::Union).is_none());
    }

    #[test]
    fn test_paths() {
        assert!(polyline_path(&[], false).is_none());
        assert!(polyline_path(&[(0.0, 0.0), (3.0, 3.0)], false).is_some());
        assert!(ellipse_path((4.0, 4.0), (0.0, 0.0)).is_some());
        assert!(device_rect((f32::NAN, 1.0), (1.0, 1.0)).is_none());
        assert!(device_rect((0.0, 1.0), (f32::INFINITY, 2.0)).is_none());
        assert!(ellipse_path((f32::NAN, 0.0), (4.0, 4.0)).is_none());
        let figures: [&[DevicePoint]; 2] = [&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], &[]];
        assert!(multi_polyline_path(figures, true).is_some());
    }
}
