/// EMF Record Types and Common Structures
///
/// Type tags and the small fixed-layout structures shared by many records.
///
/// References:
/// - [MS-EMF]: Enhanced Metafile Format Specification
use zerocopy::FromBytes;

/// Record type tags the decoder understands.
///
/// Every other tag decodes to [`Record::Skip`](super::Record::Skip).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EmrType {
    // Control records
    Header = 1,
    Eof = 14,

    // Poly records with 32-bit points
    PolyBezier = 2,
    Polygon = 3,
    Polyline = 4,
    PolyBezierTo = 5,
    PolyLineTo = 6,
    PolyPolyline = 7,
    PolyPolygon = 8,

    // Mapping
    SetWindowExtEx = 9,
    SetWindowOrgEx = 10,
    SetViewportExtEx = 11,
    SetViewportOrgEx = 12,
    SetMapMode = 17,
    SetWorldTransform = 35,
    ModifyWorldTransform = 36,

    // State
    SetPixelV = 15,
    SetBkMode = 18,
    SetPolyFillMode = 19,
    SetTextAlign = 22,
    SetTextColor = 24,
    SetBkColor = 25,
    MoveToEx = 27,
    ExcludeClipRect = 29,
    IntersectClipRect = 30,
    SaveDc = 33,
    RestoreDc = 34,

    // Objects
    SelectObject = 37,
    CreatePen = 38,
    CreateBrushIndirect = 39,
    DeleteObject = 40,
    SelectPalette = 48,
    CreatePalette = 49,
    CreateDibPatternBrushPt = 94,
    ExtCreatePen = 95,
    ExtCreateFontIndirectW = 82,

    // Shapes
    Ellipse = 42,
    Rectangle = 43,
    LineTo = 54,

    // Clipping
    ExtSelectClipRgn = 75,

    // Bitmaps
    BitBlt = 76,
    StretchBlt = 77,
    StretchDiBits = 81,

    // Text
    ExtTextOutA = 83,
    ExtTextOutW = 84,

    // Poly records with 16-bit points
    PolyBezier16 = 85,
    Polygon16 = 86,
    Polyline16 = 87,
    PolyBezierTo16 = 88,
    PolyLineTo16 = 89,
    PolyPolyline16 = 90,
    PolyPolygon16 = 91,
}

impl EmrType {
    /// Convert from the on-disk tag
    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Header),
            2 => Some(Self::PolyBezier),
            3 => Some(Self::Polygon),
            4 => Some(Self::Polyline),
            5 => Some(Self::PolyBezierTo),
            6 => Some(Self::PolyLineTo),
            7 => Some(Self::PolyPolyline),
            8 => Some(Self::PolyPolygon),
            9 => Some(Self::SetWindowExtEx),
            10 => Some(Self::SetWindowOrgEx),
            11 => Some(Self::SetViewportExtEx),
            12 => Some(Self::SetViewportOrgEx),
            14 => Some(Self::Eof),
            15 => Some(Self::SetPixelV),
            17 => Some(Self::SetMapMode),
            18 => Some(Self::SetBkMode),
            19 => Some(Self::SetPolyFillMode),
            22 => Some(Self::SetTextAlign),
            24 => Some(Self::SetTextColor),
            25 => Some(Self::SetBkColor),
            27 => Some(Self::MoveToEx),
            29 => Some(Self::ExcludeClipRect),
            30 => Some(Self::IntersectClipRect),
            33 => Some(Self::SaveDc),
            34 => Some(Self::RestoreDc),
            35 => Some(Self::SetWorldTransform),
            36 => Some(Self::ModifyWorldTransform),
            37 => Some(Self::SelectObject),
            38 => Some(Self::CreatePen),
            39 => Some(Self::CreateBrushIndirect),
            40 => Some(Self::DeleteObject),
            42 => Some(Self::Ellipse),
            43 => Some(Self::Rectangle),
            48 => Some(Self::SelectPalette),
            49 => Some(Self::CreatePalette),
            54 => Some(Self::LineTo),
            75 => Some(Self::ExtSelectClipRgn),
            76 => Some(Self::BitBlt),
            77 => Some(Self::StretchBlt),
            81 => Some(Self::StretchDiBits),
            82 => Some(Self::ExtCreateFontIndirectW),
            83 => Some(Self::ExtTextOutA),
            84 => Some(Self::ExtTextOutW),
            85 => Some(Self::PolyBezier16),
            86 => Some(Self::Polygon16),
            87 => Some(Self::Polyline16),
            88 => Some(Self::PolyBezierTo16),
            89 => Some(Self::PolyLineTo16),
            90 => Some(Self::PolyPolyline16),
            91 => Some(Self::PolyPolygon16),
            94 => Some(Self::CreateDibPatternBrushPt),
            95 => Some(Self::ExtCreatePen),
            _ => None,
        }
    }
}

// Common EMF structures read with zerocopy

/// EMF Point (POINTL) - 32-bit signed coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes)]
#[repr(C)]
pub struct PointL {
    pub x: i32,
    pub y: i32,
}

impl PointL {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// EMF Point (POINTS) - 16-bit signed coordinates
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct PointS {
    pub x: i16,
    pub y: i16,
}

impl From<PointS> for PointL {
    fn from(p: PointS) -> Self {
        PointL::new(p.x as i32, p.y as i32)
    }
}

/// EMF Rectangle (RECTL), inclusive-inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes)]
#[repr(C)]
pub struct RectL {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl RectL {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Same rectangle with `left <= right` and `top <= bottom`
    pub fn normalized(self) -> Self {
        Self {
            left: self.left.min(self.right),
            top: self.top.min(self.bottom),
            right: self.left.max(self.right),
            bottom: self.top.max(self.bottom),
        }
    }
}

/// EMF Size (SIZEL)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes)]
#[repr(C)]
pub struct SizeL {
    pub cx: i32,
    pub cy: i32,
}

impl SizeL {
    #[inline]
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }
}

/// EMF Color (COLORREF) - 0x00bbggrr format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes)]
#[repr(C)]
pub struct ColorRef {
    pub value: u32,
}

impl ColorRef {
    pub const BLACK: Self = Self::from_rgb(0, 0, 0);
    pub const WHITE: Self = Self::from_rgb(255, 255, 255);

    /// Create from RGB components
    #[inline]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            value: (r as u32) | ((g as u32) << 8) | ((b as u32) << 16),
        }
    }

    /// Extract red component
    #[inline]
    pub const fn r(self) -> u8 {
        (self.value & 0xFF) as u8
    }

    /// Extract green component
    #[inline]
    pub const fn g(self) -> u8 {
        ((self.value >> 8) & 0xFF) as u8
    }

    /// Extract blue component
    #[inline]
    pub const fn b(self) -> u8 {
        ((self.value >> 16) & 0xFF) as u8
    }

    /// Opaque tiny-skia colour
    #[inline]
    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r(), self.g(), self.b(), 255)
    }
}

/// EMF World Transform (XFORM)
///
/// Maps `(x, y)` to `(m11·x + m21·y + dx, m12·x + m22·y + dy)`.
#[derive(Debug, Clone, Copy, PartialEq, FromBytes)]
#[repr(C)]
pub struct XForm {
    pub m11: f32,
    pub m12: f32,
    pub m21: f32,
    pub m22: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Default for XForm {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl XForm {
    pub const IDENTITY: Self = Self {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
        dx: 0.0,
        dy: 0.0,
    };

    /// Check if this is the identity transform
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Transform a point
    #[inline]
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m11 as f64 * x + self.m21 as f64 * y + self.dx as f64,
            self.m12 as f64 * x + self.m22 as f64 * y + self.dy as f64,
        )
    }

    /// `self` applied first, then `other`
    pub fn then(&self, other: &XForm) -> XForm {
        XForm {
            m11: self.m11 * other.m11 + self.m12 * other.m21,
            m12: self.m11 * other.m12 + self.m12 * other.m22,
            m21: self.m21 * other.m11 + self.m22 * other.m21,
            m22: self.m21 * other.m12 + self.m22 * other.m22,
            dx: self.dx * other.m11 + self.dy * other.m21 + other.dx,
            dy: self.dx * other.m12 + self.dy * other.m22 + other.dy,
        }
    }
}

/// EMF Record Header (common to all records)
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrHeader {
    pub record_type: u32,
    pub record_size: u32,
}

/// Size of [`EmrHeader`] on disk
pub const RECORD_HEADER_SIZE: usize = 8;

/// Stock object indices (used with SelectObject)
pub mod stock_objects {
    pub const WHITE_BRUSH: u32 = 0x80000000;
    pub const LTGRAY_BRUSH: u32 = 0x80000001;
    pub const GRAY_BRUSH: u32 = 0x80000002;
    pub const DKGRAY_BRUSH: u32 = 0x80000003;
    pub const BLACK_BRUSH: u32 = 0x80000004;
    pub const NULL_BRUSH: u32 = 0x80000005;
    pub const WHITE_PEN: u32 = 0x80000006;
    pub const BLACK_PEN: u32 = 0x80000007;
    pub const NULL_PEN: u32 = 0x80000008;
    pub const OEM_FIXED_FONT: u32 = 0x8000000A;
    pub const ANSI_FIXED_FONT: u32 = 0x8000000B;
    pub const ANSI_VAR_FONT: u32 = 0x8000000C;
    pub const SYSTEM_FONT: u32 = 0x8000000D;
    pub const DEVICE_DEFAULT_FONT: u32 = 0x8000000E;
    pub const DEFAULT_PALETTE: u32 = 0x8000000F;
    pub const SYSTEM_FIXED_FONT: u32 = 0x80000010;
    pub const DEFAULT_GUI_FONT: u32 = 0x80000011;
    pub const DC_BRUSH: u32 = 0x80000012;
    pub const DC_PEN: u32 = 0x80000013;

    /// Check if value is a stock object
    #[inline]
    pub const fn is_stock_object(value: u32) -> bool {
        (value & 0x80000000) != 0
    }
}
