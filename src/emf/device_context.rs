// Device Context (DC) for EMF playback
//
// The device context owns everything one render mutates: the drawing state
// (mapping, selected objects, colours, modes, clip), the save/restore stack,
// the object table and the raster. Records are applied strictly in order.

use super::converter::RenderOptions;
use super::font::{FontLibrary, FontResolver};
use super::gdi_objects::{Brush, GdiObject, ObjectKind, ObjectTable, Pen};
use super::parser::EmfHeader;
use super::pixel::DibImage;
use super::raster::blit::{self, BlitPattern, DestRect, SourceRect};
use super::raster::text::{self, TextRun};
use super::raster::{
    self, Canvas, ClipOp, DevicePoint, bezier_path, ellipse_path, multi_polyline_path,
    polyline_path,
};
use super::records::state::{MapMode, ModifyWorldTransformMode, RegionMode};
use super::records::types::stock_objects;
use super::records::{
    BitBlt, ColorRef, ExtTextOut, LogFont, PointL, Poly, PolyPoly, Record, RectL, RegionData,
    SizeL, TextOptions, XForm,
};
use crate::common::error::{Error, Result};
use bitflags::bitflags;
use image::RgbaImage;
use std::sync::Arc;
use tiny_skia::{FillRule, Mask, Path, PathBuilder, Rect, Transform};
use tracing::{debug, trace, warn};

bitflags! {
    /// Text alignment (TA_*)
    ///
    /// Left and top are the zero values, so they have no flag of their own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextAlign: u32 {
        /// Draw at and advance the current position
        const UPDATECP = 0x0001;
        const RIGHT = 0x0002;
        const CENTER = 0x0006;
        const BOTTOM = 0x0008;
        const BASELINE = 0x0018;
        const RTLREADING = 0x0100;

        const _ = !0;
    }
}

impl TextAlign {
    pub fn is_center(&self) -> bool {
        self.contains(Self::CENTER)
    }

    pub fn is_right(&self) -> bool {
        self.contains(Self::RIGHT) && !self.is_center()
    }

    pub fn is_bottom(&self) -> bool {
        self.contains(Self::BOTTOM) && !self.is_baseline()
    }

    pub fn is_baseline(&self) -> bool {
        self.contains(Self::BASELINE)
    }
}

/// Background mix mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BackgroundMode {
    Transparent = 1,
    Opaque = 2,
}

impl BackgroundMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Transparent),
            2 => Some(Self::Opaque),
            _ => None,
        }
    }
}

/// Polygon fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PolyFillMode {
    Alternate = 1,
    Winding = 2,
}

impl PolyFillMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Alternate),
            2 => Some(Self::Winding),
            _ => None,
        }
    }

    pub fn fill_rule(&self) -> FillRule {
        match self {
            Self::Alternate => FillRule::EvenOdd,
            Self::Winding => FillRule::Winding,
        }
    }
}

impl From<RegionMode> for ClipOp {
    fn from(mode: RegionMode) -> Self {
        match mode {
            RegionMode::And => ClipOp::Intersect,
            RegionMode::Or => ClipOp::Union,
            RegionMode::Xor => ClipOp::Xor,
            RegionMode::Diff => ClipOp::Difference,
            RegionMode::Copy => ClipOp::Replace,
        }
    }
}

/// Drawing state saved and restored by EMR_SAVEDC / EMR_RESTOREDC
#[derive(Clone)]
pub struct DcState {
    pub map_mode: MapMode,
    pub window_org: PointL,
    /// `None` until the stream sets it
    pub window_ext: Option<SizeL>,
    pub viewport_org: PointL,
    pub viewport_ext: Option<SizeL>,
    pub world: XForm,

    // Realized copies of the selected objects
    pub pen: Pen,
    pub brush: Brush,
    pub font: LogFont,

    /// Current position in logical units
    pub current: PointL,

    pub text_color: ColorRef,
    pub bk_color: ColorRef,
    pub bk_mode: BackgroundMode,
    pub fill_mode: PolyFillMode,
    pub text_align: TextAlign,

    /// `None` means nothing is clipped
    pub clip: Option<Mask>,
}

impl Default for DcState {
    fn default() -> Self {
        Self {
            map_mode: MapMode::Text,
            window_org: PointL::default(),
            window_ext: None,
            viewport_org: PointL::default(),
            viewport_ext: None,
            world: XForm::IDENTITY,
            pen: Pen::default(),
            brush: Brush::default(),
            font: LogFont::default(),
            current: PointL::default(),
            text_color: ColorRef::BLACK,
            bk_color: ColorRef::WHITE,
            bk_mode: BackgroundMode::Opaque,
            fill_mode: PolyFillMode::Alternate,
            text_align: TextAlign::empty(),
            clip: None,
        }
    }
}

/// Saved states for SaveDC/RestoreDC
#[derive(Default)]
pub struct StateStack {
    stack: Vec<DcState>,
}

impl StateStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: DcState) {
        self.stack.push(state);
    }

    /// Pop to a RestoreDC index.
    ///
    /// Negative indices count back from the most recent save; positive ones
    /// are absolute, 1 being the oldest. Out-of-range indices leave the stack
    /// untouched and return `None`.
    pub fn pop_to(&mut self, index: i32) -> Option<DcState> {
        if index < 0 {
            let count = index.unsigned_abs() as usize;
            if count <= self.stack.len() {
                for _ in 1..count {
                    self.stack.pop();
                }
                return self.stack.pop();
            }
        } else if index > 0 {
            let position = (index - 1) as usize;
            if position < self.stack.len() {
                self.stack.truncate(position + 1);
                return self.stack.pop();
            }
        }
        None
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Stateful interpreter that plays records onto a raster
pub struct DeviceContext {
    canvas: Canvas,
    /// Header bounds; their top-left corner is raster pixel (0, 0)
    bounds: RectL,
    objects: ObjectTable,
    state: DcState,
    saved: StateStack,
    fonts: FontLibrary,
}

impl DeviceContext {
    /// Allocate the raster for `header` and start from the default state.
    pub fn new(header: &EmfHeader, options: &RenderOptions, resolver: Arc<dyn FontResolver>) -> Result<Self> {
        let (width, height) = header.raster_size()?;
        if width > options.max_dimension || height > options.max_dimension {
            return Err(Error::InvalidRasterSize {
                width: width as i64,
                height: height as i64,
            });
        }
        let [r, g, b] = options.background;
        let canvas = Canvas::new(width, height, ColorRef::from_rgb(r, g, b), options.anti_alias)?;
        debug!(width, height, "created raster");

        Ok(Self {
            canvas,
            bounds: header.bounds,
            objects: ObjectTable::new(),
            state: DcState::default(),
            saved: StateStack::new(),
            fonts: FontLibrary::new(options.font_dir.clone(), resolver),
        })
    }

    pub fn state(&self) -> &DcState {
        &self.state
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Hand back the finished raster
    pub fn finish(self) -> Result<RgbaImage> {
        self.canvas.into_image()
    }

    // Coordinate mapping

    /// Logical-to-device scale per axis from the mapping mode and extents
    pub fn scale(&self) -> (f64, f64) {
        let s = &self.state;
        let Some(window) = s.window_ext.filter(|e| e.cx != 0 && e.cy != 0) else {
            return (1.0, 1.0);
        };
        if s.map_mode.uses_viewport_extent() {
            let Some(viewport) = s.viewport_ext.filter(|e| e.cx != 0 && e.cy != 0) else {
                return (1.0, 1.0);
            };
            let sx = viewport.cx as f64 / window.cx as f64;
            let sy = viewport.cy as f64 / window.cy as f64;
            if s.map_mode == MapMode::Isotropic {
                // The X scale wins; Y keeps its own direction
                (sx, sx.abs() * sy.signum())
            } else {
                (sx, sy)
            }
        } else {
            (
                self.canvas.width() as f64 / window.cx as f64,
                self.canvas.height() as f64 / window.cy as f64,
            )
        }
    }

    /// Map a logical coordinate to raster pixels
    pub fn to_device(&self, x: f64, y: f64) -> DevicePoint {
        let s = &self.state;
        let (wx, wy) = s.world.transform_point(x, y);
        let (sx, sy) = self.scale();
        (
            ((wx - s.window_org.x as f64) * sx + s.viewport_org.x as f64 - self.bounds.left as f64)
                as f32,
            ((wy - s.window_org.y as f64) * sy + s.viewport_org.y as f64 - self.bounds.top as f64)
                as f32,
        )
    }

    #[inline]
    pub fn map_point(&self, point: PointL) -> DevicePoint {
        self.to_device(point.x as f64, point.y as f64)
    }

    /// Pixels per logical unit along the logical X and Y axes
    fn axis_scale(&self) -> (f32, f32) {
        let (sx, sy) = self.scale();
        let w = &self.state.world;
        (
            (sx.abs() * (w.m11 as f64).hypot(w.m12 as f64)) as f32,
            (sy.abs() * (w.m21 as f64).hypot(w.m22 as f64)) as f32,
        )
    }

    /// The four corners of a logical rectangle, in drawing order
    fn rect_corners(&self, rect: RectL) -> [DevicePoint; 4] {
        let (l, t, r, b) = (
            rect.left as f64,
            rect.top as f64,
            rect.right as f64,
            rect.bottom as f64,
        );
        [
            self.to_device(l, t),
            self.to_device(r, t),
            self.to_device(r, b),
            self.to_device(l, b),
        ]
    }

    fn map_points(&self, points: &[PointL]) -> Vec<DevicePoint> {
        points.iter().map(|&p| self.map_point(p)).collect()
    }

    // Record playback

    /// Apply one record to the state and raster.
    ///
    /// Errors leave the context usable; the caller decides whether they end
    /// the render.
    pub fn apply(&mut self, record: &Record) -> Result<()> {
        trace!(record = record.name(), "apply");
        match record {
            Record::Header(_) | Record::Eof(_) | Record::Skip { .. } => {},

            // Mapping
            Record::SetMapMode(mode) => match MapMode::from_u32(*mode) {
                Some(mode) => self.state.map_mode = mode,
                None => debug!(mode, "ignoring unknown mapping mode"),
            },
            Record::SetWindowExtEx(size) => self.state.window_ext = Some(*size),
            Record::SetWindowOrgEx(point) => self.state.window_org = *point,
            Record::SetViewportExtEx(size) => self.state.viewport_ext = Some(*size),
            Record::SetViewportOrgEx(point) => self.state.viewport_org = *point,
            Record::SetWorldTransform(xform) => self.state.world = *xform,
            Record::ModifyWorldTransform { xform, mode } => self.modify_world_transform(xform, *mode),

            // State
            Record::SetBkMode(mode) => match BackgroundMode::from_u32(*mode) {
                Some(mode) => self.state.bk_mode = mode,
                None => debug!(mode, "ignoring unknown background mode"),
            },
            Record::SetPolyFillMode(mode) => match PolyFillMode::from_u32(*mode) {
                Some(mode) => self.state.fill_mode = mode,
                None => debug!(mode, "ignoring unknown fill mode"),
            },
            Record::SetTextAlign(align) => self.state.text_align = TextAlign::from_bits_retain(*align),
            Record::SetTextColor(color) => self.state.text_color = *color,
            Record::SetBkColor(color) => self.state.bk_color = *color,
            Record::SaveDc => self.saved.push(self.state.clone()),
            Record::RestoreDc(index) => self.restore_dc(*index),
            Record::MoveToEx(point) => self.state.current = *point,

            // Clipping
            Record::IntersectClipRect(rect) => self.clip_rect(*rect, ClipOp::Intersect)?,
            Record::ExcludeClipRect(rect) => self.clip_rect(*rect, ClipOp::Difference)?,
            Record::ExtSelectClipRgn { mode, region } => self.select_clip_region(*mode, region.as_ref())?,

            // Objects
            Record::CreatePen { handle, pen } => self.objects.insert(*handle, GdiObject::Pen(pen.clone()))?,
            Record::ExtCreatePen { handle, pen } => {
                self.objects.insert(*handle, GdiObject::ExtendedPen(pen.clone()))?
            },
            Record::CreateBrushIndirect { handle, brush } => {
                self.objects.insert(*handle, GdiObject::Brush(brush.clone()))?
            },
            Record::CreateDibPatternBrushPt { handle, dib, .. } => {
                self.objects.insert(*handle, GdiObject::Bitmap(dib.clone()))?
            },
            Record::ExtCreateFontIndirectW { handle, font } => {
                self.objects.insert(*handle, GdiObject::Font(font.clone()))?
            },
            Record::CreatePalette { handle, palette } => {
                self.objects.insert(*handle, GdiObject::Palette(palette.clone()))?
            },
            Record::SelectObject(handle) => self.select_object(*handle)?,
            Record::SelectPalette(handle) => {
                if *handle != stock_objects::DEFAULT_PALETTE {
                    self.objects.select(*handle)?;
                }
            },
            Record::DeleteObject(handle) => {
                if !stock_objects::is_stock_object(*handle) {
                    self.objects.delete(*handle)?;
                }
            },

            // Drawing
            Record::SetPixelV { point, color } => {
                let (x, y) = self.map_point(*point);
                self.canvas
                    .set_pixel(x.floor() as i64, y.floor() as i64, *color, self.state.clip.as_ref());
            },
            Record::LineTo(point) => {
                let from = self.map_point(self.state.current);
                let to = self.map_point(*point);
                self.state.current = *point;
                if let Some(path) = polyline_path(&[from, to], false) {
                    self.stroke(&path);
                }
            },
            Record::Rectangle(rect) => {
                let path = polyline_path(&self.rect_corners(*rect), true);
                self.fill_and_stroke(path)?;
            },
            Record::Ellipse(rect) => {
                let a = self.map_point(PointL::new(rect.left, rect.top));
                let b = self.map_point(PointL::new(rect.right, rect.bottom));
                self.fill_and_stroke(ellipse_path(a, b))?;
            },
            Record::Polygon(poly) => {
                let path = polyline_path(&self.map_points(&poly.points), true);
                self.fill_and_stroke(path)?;
            },
            Record::Polyline(poly) => {
                if let Some(path) = polyline_path(&self.map_points(&poly.points), false) {
                    self.stroke(&path);
                }
            },
            Record::PolylineTo(poly) => self.polyline_to(poly),
            Record::PolyBezier(poly) => {
                if let Some((&first, rest)) = poly.points.split_first()
                    && let Some(path) = bezier_path(self.map_point(first), &self.map_points(rest))
                {
                    self.stroke(&path);
                }
            },
            Record::PolyBezierTo(poly) => self.poly_bezier_to(poly),
            Record::PolyPolyline(poly) => {
                if let Some(path) = self.poly_poly_path(poly, false) {
                    self.stroke(&path);
                }
            },
            Record::PolyPolygon(poly) => {
                let path = self.poly_poly_path(poly, true);
                self.fill_and_stroke(path)?;
            },

            // Bitmaps
            Record::BitBlt(blt) | Record::StretchBlt(blt) | Record::StretchDiBits(blt) => {
                self.bit_blt(blt)?
            },

            // Text
            Record::ExtTextOutA(text) | Record::ExtTextOutW(text) => self.ext_text_out(text)?,
        }
        Ok(())
    }

    fn modify_world_transform(&mut self, xform: &XForm, mode: u32) {
        let world = &mut self.state.world;
        match ModifyWorldTransformMode::from_u32(mode) {
            Some(ModifyWorldTransformMode::Identity) => *world = XForm::IDENTITY,
            Some(ModifyWorldTransformMode::LeftMultiply) => *world = xform.then(world),
            Some(ModifyWorldTransformMode::RightMultiply) => *world = world.then(xform),
            Some(ModifyWorldTransformMode::Set) => *world = *xform,
            None => debug!(mode, "ignoring unknown world transform mode"),
        }
    }

    fn restore_dc(&mut self, index: i32) {
        match self.saved.pop_to(index) {
            Some(state) => self.state = state,
            None => warn!(index, depth = self.saved.depth(), "RestoreDC index out of range, ignored"),
        }
    }

    // Objects

    fn select_object(&mut self, handle: u32) -> Result<()> {
        if stock_objects::is_stock_object(handle) {
            return self.select_stock_object(handle);
        }

        let kind = self.objects.select(handle)?;
        match self.objects.get(handle)? {
            GdiObject::Pen(pen) => self.state.pen = Pen::from_log_pen(pen),
            GdiObject::ExtendedPen(pen) => self.state.pen = Pen::from_ext_log_pen(pen),
            GdiObject::Brush(brush) => self.state.brush = Brush::from_log_brush(brush),
            GdiObject::Bitmap(dib) => self.state.brush = Brush::Pattern(dib.clone()),
            GdiObject::Font(font) => self.state.font = font.clone(),
            GdiObject::Palette(_) => {},
        }
        debug!(handle, ?kind, "selected object");
        Ok(())
    }

    fn select_stock_object(&mut self, handle: u32) -> Result<()> {
        if let Some(pen) = Pen::stock(handle) {
            self.state.pen = pen;
            self.objects.deselect(ObjectKind::Pen);
        } else if let Some(brush) = Brush::stock(handle) {
            self.state.brush = brush;
            self.objects.deselect(ObjectKind::Brush);
        } else if handle == stock_objects::DEFAULT_PALETTE {
            self.objects.deselect(ObjectKind::Palette);
        } else if matches!(
            handle,
            stock_objects::OEM_FIXED_FONT..=stock_objects::DEVICE_DEFAULT_FONT
                | stock_objects::SYSTEM_FIXED_FONT
                | stock_objects::DEFAULT_GUI_FONT
        ) {
            self.state.font = LogFont::default();
            self.objects.deselect(ObjectKind::Font);
        } else {
            return Err(Error::UnknownHandle(handle));
        }
        debug!(handle, "selected stock object");
        Ok(())
    }

    // Clipping

    fn empty_mask(&self) -> Result<Mask> {
        Mask::new(self.canvas.width(), self.canvas.height())
            .ok_or_else(|| Error::Drawing("cannot allocate a clip mask".to_string()))
    }

    fn combine_path_clip(&mut self, path: Option<Path>, op: ClipOp) -> Result<()> {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        // A degenerate area covers nothing
        let area = match path.and_then(|path| raster::path_mask(width, height, &path)) {
            Some(mask) => mask,
            None => self.empty_mask()?,
        };
        self.state.clip = raster::combine_clip(self.state.clip.take(), area, op);
        Ok(())
    }

    fn clip_rect(&mut self, rect: RectL, op: ClipOp) -> Result<()> {
        let path = polyline_path(&self.rect_corners(rect), true);
        self.combine_path_clip(path, op)
    }

    /// Rasterize region rectangles; they are device units relative to the bounds
    fn region_mask(&self, region: &RegionData) -> Result<Mask> {
        let mut mask = self.empty_mask()?;
        let (ox, oy) = (self.bounds.left as f32, self.bounds.top as f32);
        let mut pb = PathBuilder::new();
        for rect in region.rects.iter().map(|r| r.normalized()) {
            if let Some(rect) = Rect::from_ltrb(
                rect.left as f32 - ox,
                rect.top as f32 - oy,
                rect.right as f32 - ox,
                rect.bottom as f32 - oy,
            ) {
                pb.push_rect(rect);
            }
        }
        if let Some(path) = pb.finish() {
            mask.fill_path(&path, FillRule::Winding, false, Transform::identity());
        }
        Ok(mask)
    }

    fn select_clip_region(&mut self, mode: u32, region: Option<&RegionData>) -> Result<()> {
        let mode = RegionMode::from_u32(mode)
            .ok_or_else(|| Error::Drawing(format!("unknown region mode {mode}")))?;
        match region {
            None if mode == RegionMode::Copy => self.state.clip = None,
            None => debug!(?mode, "region combine without region data, ignored"),
            Some(region) => {
                let area = self.region_mask(region)?;
                self.state.clip = raster::combine_clip(self.state.clip.take(), area, mode.into());
            },
        }
        Ok(())
    }

    // Drawing

    fn stroke(&mut self, path: &Path) {
        if self.state.pen.is_null() {
            return;
        }
        let (ax, ay) = self.axis_scale();
        let stroke = self.state.pen.to_stroke((ax + ay) / 2.0);
        let paint = self.canvas.solid_paint(self.state.pen.color);
        self.canvas
            .stroke_path(path, &paint, &stroke, self.state.clip.as_ref());
    }

    fn fill(&mut self, path: &Path) -> Result<()> {
        let rule = self.state.fill_mode.fill_rule();
        let clip = self.state.clip.as_ref();
        match &self.state.brush {
            Brush::Null => {},
            Brush::Solid(color) | Brush::Hatched { color, .. } => {
                let paint = self.canvas.solid_paint(*color);
                self.canvas.fill_path(path, &paint, rule, clip);
            },
            Brush::Pattern(dib) => {
                let pixmap = DibImage::from_dib(dib)?.to_pixmap()?;
                let paint = self.canvas.pattern_paint(&pixmap);
                self.canvas.fill_path(path, &paint, rule, clip);
            },
        }
        Ok(())
    }

    /// Fill with the brush, then outline with the pen
    fn fill_and_stroke(&mut self, path: Option<Path>) -> Result<()> {
        let Some(path) = path else {
            return Ok(());
        };
        let filled = self.fill(&path);
        self.stroke(&path);
        filled
    }

    fn polyline_to(&mut self, poly: &Poly) {
        let Some(&last) = poly.points.last() else {
            return;
        };
        let mut points = vec![self.map_point(self.state.current)];
        points.extend(self.map_points(&poly.points));
        self.state.current = last;
        if let Some(path) = polyline_path(&points, false) {
            self.stroke(&path);
        }
    }

    fn poly_bezier_to(&mut self, poly: &Poly) {
        let Some(&last) = poly.points.last() else {
            return;
        };
        let start = self.map_point(self.state.current);
        let segments = self.map_points(&poly.points);
        self.state.current = last;
        if let Some(path) = bezier_path(start, &segments) {
            self.stroke(&path);
        }
    }

    fn poly_poly_path(&self, poly: &PolyPoly, close: bool) -> Option<Path> {
        let figures: Vec<Vec<DevicePoint>> = poly.figures().map(|f| self.map_points(f)).collect();
        multi_polyline_path(figures.iter().map(Vec::as_slice), close)
    }

    // Bitmaps

    fn bit_blt(&mut self, blt: &BitBlt) -> Result<()> {
        let source = blt.source.as_ref().map(DibImage::from_dib).transpose()?;
        let pattern = if blit::uses_pattern(blt.rop) {
            match &self.state.brush {
                Brush::Solid(c) | Brush::Hatched { color: c, .. } => BlitPattern::Color([c.r(), c.g(), c.b()]),
                Brush::Null => BlitPattern::Color([0, 0, 0]),
                Brush::Pattern(dib) => BlitPattern::Image(DibImage::from_dib(dib)?),
            }
        } else {
            BlitPattern::Color([0, 0, 0])
        };

        let (x0, y0) = self.to_device(blt.x_dest as f64, blt.y_dest as f64);
        let (x1, y1) = self.to_device(
            blt.x_dest as f64 + blt.cx_dest as f64,
            blt.y_dest as f64 + blt.cy_dest as f64,
        );
        let src = SourceRect {
            x: blt.x_src,
            y: blt.y_src,
            cx: blt.cx_src,
            cy: blt.cy_src,
        };
        let written = blit::blit(
            &mut self.canvas,
            source.as_ref(),
            src,
            DestRect { x0, y0, x1, y1 },
            blt.rop,
            &pattern,
            self.state.clip.as_ref(),
        )?;
        trace!(written, rop = blt.rop, "bit block transfer");
        Ok(())
    }

    // Text

    fn ext_text_out(&mut self, record: &ExtTextOut) -> Result<()> {
        let text = &record.text;
        if text.options.contains(TextOptions::OPAQUE) {
            let path = polyline_path(&self.rect_corners(text.rectangle), true);
            if let Some(path) = path {
                let paint = self.canvas.solid_paint(self.state.bk_color);
                self.canvas
                    .fill_path(&path, &paint, FillRule::Winding, self.state.clip.as_ref());
            }
        }

        if text.options.contains(TextOptions::CLIPPED) {
            let saved = self.state.clip.clone();
            self.clip_rect(text.rectangle, ClipOp::Intersect)?;
            let drawn = self.draw_text(record);
            self.state.clip = saved;
            drawn
        } else {
            self.draw_text(record)
        }
    }

    fn draw_text(&mut self, record: &ExtTextOut) -> Result<()> {
        let text = &record.text;
        if text.is_empty() {
            return Ok(());
        }
        let align = self.state.text_align;
        let reference = if align.contains(TextAlign::UPDATECP) {
            self.state.current
        } else {
            text.reference
        };

        let Some(font_data) = self.fonts.load(&self.state.font.face_name) else {
            // Logged once by the library
            return Ok(());
        };

        let (ax, ay) = self.axis_scale();
        let advances: Vec<f32> = text.dx.iter().map(|&dx| dx as f32 * ax).collect();
        let font = &self.state.font;
        let run = TextRun {
            code_units: &text.code_units,
            glyph_indices: text.options.contains(TextOptions::GLYPH_INDEX),
            advances: &advances,
            reference: self.map_point(reference),
            align,
            escapement: font.escapement as f32 / 10.0,
            height: font.height as f32 * ay,
            underline: font.underline,
            strike_out: font.strike_out,
            color: self.state.text_color,
            background: (self.state.bk_mode == BackgroundMode::Opaque).then_some(self.state.bk_color),
        };
        let width = text::draw_text(&mut self.canvas, &font_data, &run, self.state.clip.as_ref())?;

        if align.contains(TextAlign::UPDATECP) {
            let advance = if text.dx.is_empty() {
                if ax > 0.0 { (width / ax) as i64 } else { 0 }
            } else {
                text.dx.iter().map(|&dx| dx as i64).sum()
            };
            let advance = advance.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
            if align.is_right() {
                self.state.current.x = reference.x.saturating_sub(advance);
            } else if !align.is_center() {
                self.state.current.x = reference.x.saturating_add(advance);
            }
        }
        Ok(())
    }
}
