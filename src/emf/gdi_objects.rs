// GDI Object Management for EMF rendering
//
// This module manages GDI objects (pens, brushes, fonts, palettes, bitmaps)
// that are created, selected, and deleted during EMF playback.

use super::records::objects::{ExtLogPen, LogBrush, LogFont, LogPalette, LogPen, brush_style, pen_style};
use super::records::types::{ColorRef, stock_objects};
use super::records::Dib;
use crate::common::error::{Error, Result};
use std::collections::HashMap;
use tiny_skia::{LineCap, LineJoin, Stroke, StrokeDash};

/// Pen styles from GDI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PenStyle {
    Solid = 0,
    Dash = 1,
    Dot = 2,
    DashDot = 3,
    DashDotDot = 4,
    Null = 5,
    InsideFrame = 6,
    UserStyle = 7,
    Alternate = 8,
}

impl PenStyle {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value & pen_style::STYLE_MASK {
            0 => Some(Self::Solid),
            1 => Some(Self::Dash),
            2 => Some(Self::Dot),
            3 => Some(Self::DashDot),
            4 => Some(Self::DashDotDot),
            5 => Some(Self::Null),
            6 => Some(Self::InsideFrame),
            7 => Some(Self::UserStyle),
            8 => Some(Self::Alternate),
            _ => None,
        }
    }

    /// Dash and gap lengths for the predefined styles, scaled by pen width
    pub fn dash_pattern(&self, width: f32) -> Option<Vec<f32>> {
        let w = width.max(1.0);
        match self {
            Self::Solid | Self::InsideFrame | Self::Null | Self::UserStyle => None,
            Self::Dash => Some(vec![w * 3.0, w]),
            Self::Dot | Self::Alternate => Some(vec![w, w]),
            Self::DashDot => Some(vec![w * 3.0, w, w, w]),
            Self::DashDotDot => Some(vec![w * 3.0, w, w, w, w, w]),
        }
    }
}

/// Brush styles from GDI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BrushStyle {
    Solid = 0,
    Null = 1,
    Hatched = 2,
    Pattern = 3,
    DibPattern = 5,
    DibPatternPt = 6,
}

impl BrushStyle {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            brush_style::SOLID => Some(Self::Solid),
            brush_style::NULL => Some(Self::Null),
            brush_style::HATCHED => Some(Self::Hatched),
            brush_style::PATTERN => Some(Self::Pattern),
            brush_style::DIBPATTERN => Some(Self::DibPattern),
            brush_style::DIBPATTERNPT => Some(Self::DibPatternPt),
            _ => None,
        }
    }
}

/// Pen object for stroking
#[derive(Debug, Clone, PartialEq)]
pub struct Pen {
    pub style: PenStyle,
    /// Width in logical units; 0 draws a one-pixel cosmetic line
    pub width: f32,
    pub color: ColorRef,
    /// Explicit dash pattern in logical units (`PS_USERSTYLE`)
    pub user_dashes: Vec<f32>,
    pub cap: LineCap,
    pub join: LineJoin,
}

impl Default for Pen {
    fn default() -> Self {
        Self::solid(ColorRef::BLACK)
    }
}

impl Pen {
    fn solid(color: ColorRef) -> Self {
        Self {
            style: PenStyle::Solid,
            width: 0.0,
            color,
            user_dashes: Vec::new(),
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }

    /// The NULL_PEN stock object
    pub fn null() -> Self {
        Self {
            style: PenStyle::Null,
            ..Self::default()
        }
    }

    /// Realize an EMR_CREATEPEN pen
    pub fn from_log_pen(pen: &LogPen) -> Self {
        Self {
            style: PenStyle::from_u32(pen.style).unwrap_or(PenStyle::Solid),
            width: pen.width.max(0) as f32,
            color: pen.color,
            ..Self::solid(pen.color)
        }
    }

    /// Realize an EMR_EXTCREATEPEN pen
    pub fn from_ext_log_pen(pen: &ExtLogPen) -> Self {
        let style = if pen.brush_style == brush_style::NULL {
            PenStyle::Null
        } else {
            PenStyle::from_u32(pen.style).unwrap_or(PenStyle::Solid)
        };
        let cap = match pen.style & pen_style::ENDCAP_MASK {
            pen_style::ENDCAP_SQUARE => LineCap::Square,
            pen_style::ENDCAP_FLAT => LineCap::Butt,
            _ => LineCap::Round,
        };
        let join = match pen.style & pen_style::JOIN_MASK {
            pen_style::JOIN_BEVEL => LineJoin::Bevel,
            pen_style::JOIN_MITER => LineJoin::Miter,
            _ => LineJoin::Round,
        };
        Self {
            style,
            width: pen.width as f32,
            color: pen.color,
            user_dashes: pen.style_entries.iter().map(|&len| len as f32).collect(),
            cap,
            join,
        }
    }

    /// Realize a stock pen; `None` when the handle is not a stock pen
    pub fn stock(handle: u32) -> Option<Self> {
        match handle {
            stock_objects::WHITE_PEN => Some(Self::solid(ColorRef::WHITE)),
            stock_objects::BLACK_PEN | stock_objects::DC_PEN => Some(Self::default()),
            stock_objects::NULL_PEN => Some(Self::null()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.style == PenStyle::Null
    }

    /// Build a device-space stroke; `scale` maps logical lengths to pixels.
    pub fn to_stroke(&self, scale: f32) -> Stroke {
        let width = if self.width > 0.0 {
            (self.width * scale).max(1.0)
        } else {
            1.0
        };

        let pattern = if self.style == PenStyle::UserStyle {
            let mut dashes: Vec<f32> = self.user_dashes.iter().map(|len| len * scale).collect();
            // An odd list repeats with dashes and gaps swapped
            if dashes.len() % 2 == 1 {
                dashes.extend_from_within(..);
            }
            Some(dashes)
        } else {
            self.style.dash_pattern(width)
        };

        Stroke {
            width,
            line_cap: self.cap,
            line_join: self.join,
            dash: pattern.and_then(|dashes| StrokeDash::new(dashes, 0.0)),
            ..Stroke::default()
        }
    }
}

/// Brush object for filling
#[derive(Debug, Clone, PartialEq)]
pub enum Brush {
    Solid(ColorRef),
    Null,
    /// Hatch lines are not drawn; the hatch colour fills the whole area
    Hatched { color: ColorRef, hatch: u32 },
    /// Tiled device-independent bitmap
    Pattern(Dib),
}

impl Default for Brush {
    /// The WHITE_BRUSH stock object, selected in a fresh device context
    fn default() -> Self {
        Brush::Solid(ColorRef::WHITE)
    }
}

impl Brush {
    /// Realize an EMR_CREATEBRUSHINDIRECT brush
    pub fn from_log_brush(brush: &LogBrush) -> Self {
        match BrushStyle::from_u32(brush.style) {
            Some(BrushStyle::Null) => Brush::Null,
            Some(BrushStyle::Hatched) => Brush::Hatched {
                color: brush.color,
                hatch: brush.hatch,
            },
            _ => Brush::Solid(brush.color),
        }
    }

    /// Realize a stock brush; `None` when the handle is not a stock brush
    pub fn stock(handle: u32) -> Option<Self> {
        let gray = |level| Brush::Solid(ColorRef::from_rgb(level, level, level));
        match handle {
            stock_objects::WHITE_BRUSH | stock_objects::DC_BRUSH => Some(Brush::default()),
            stock_objects::LTGRAY_BRUSH => Some(gray(0xC0)),
            stock_objects::GRAY_BRUSH => Some(gray(0x80)),
            stock_objects::DKGRAY_BRUSH => Some(gray(0x40)),
            stock_objects::BLACK_BRUSH => Some(Brush::Solid(ColorRef::BLACK)),
            stock_objects::NULL_BRUSH => Some(Brush::Null),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Brush::Null)
    }
}

/// GDI Object types
#[derive(Debug, Clone, PartialEq)]
pub enum GdiObject {
    Pen(LogPen),
    ExtendedPen(ExtLogPen),
    Brush(LogBrush),
    Font(LogFont),
    Palette(LogPalette),
    /// DIB pattern brush source
    Bitmap(Dib),
}

/// Selection category of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Pen,
    Brush,
    Font,
    Palette,
}

impl GdiObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            GdiObject::Pen(_) | GdiObject::ExtendedPen(_) => ObjectKind::Pen,
            GdiObject::Brush(_) | GdiObject::Bitmap(_) => ObjectKind::Brush,
            GdiObject::Font(_) => ObjectKind::Font,
            GdiObject::Palette(_) => ObjectKind::Palette,
        }
    }
}

/// GDI Object table
///
/// Manages the object table for EMF playback. Objects are created with
/// EMR_CREATE* records under the handle the stream assigns, selected with
/// EMR_SELECTOBJECT, and deleted with EMR_DELETEOBJECT. Handle 0 is never
/// valid. The table lives for exactly one render.
#[derive(Debug, Default)]
pub struct ObjectTable {
    objects: HashMap<u32, GdiObject>,
    selected: HashMap<ObjectKind, u32>,
}

impl ObjectTable {
    /// Create new empty object table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object under the next unused positive handle
    pub fn create(&mut self, object: GdiObject) -> u32 {
        let handle = (1..=u32::MAX)
            .find(|handle| !self.objects.contains_key(handle))
            .unwrap_or(u32::MAX);
        self.objects.insert(handle, object);
        handle
    }

    /// Store an object under a stream-assigned handle
    pub fn insert(&mut self, handle: u32, object: GdiObject) -> Result<()> {
        if handle == 0 {
            return Err(Error::UnknownHandle(0));
        }
        if self.objects.contains_key(&handle) {
            // Render-time tables do not know the record offset
            return Err(Error::DuplicateHandle { handle, offset: 0 });
        }
        self.objects.insert(handle, object);
        Ok(())
    }

    /// Get object by handle
    pub fn get(&self, handle: u32) -> Result<&GdiObject> {
        self.objects
            .get(&handle)
            .ok_or(Error::UnknownHandle(handle))
    }

    /// Remove an object, clearing any selection that refers to it
    pub fn delete(&mut self, handle: u32) -> Result<GdiObject> {
        let object = self
            .objects
            .remove(&handle)
            .ok_or(Error::UnknownHandle(handle))?;
        self.selected.retain(|_, selected| *selected != handle);
        Ok(object)
    }

    /// Make an object the active one of its category
    pub fn select(&mut self, handle: u32) -> Result<ObjectKind> {
        let kind = self.get(handle)?.kind();
        self.selected.insert(kind, handle);
        Ok(kind)
    }

    /// Drop the selection of a category (a stock object took its place)
    pub fn deselect(&mut self, kind: ObjectKind) {
        self.selected.remove(&kind);
    }

    /// Currently selected object of a category
    pub fn selected(&self, kind: ObjectKind) -> Option<&GdiObject> {
        self.selected
            .get(&kind)
            .and_then(|handle| self.objects.get(handle))
    }

    /// Check if handle exists
    pub fn contains(&self, handle: u32) -> bool {
        self.objects.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
