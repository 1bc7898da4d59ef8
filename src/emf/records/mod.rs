/// EMF Record Definitions
///
/// On-disk layouts are `#[repr(C)]` structures read with `zerocopy`; each
/// supported record decodes into one variant of [`Record`].
pub mod bitmap;
pub mod drawing;
pub mod objects;
pub mod state;
pub mod text;
pub mod types;

// Re-export commonly used types
pub use bitmap::{BitBlt, BitmapInfoHeader, Dib};
pub use drawing::{Poly, PolyPoly};
pub use objects::{ExtLogPen, LogBrush, LogFont, LogPalette, LogPen, PaletteEntry};
pub use state::{RegionData, RegionMode};
pub use text::{EmrText, ExtTextOut, TextOptions};
pub use types::{ColorRef, EmrType, PointL, RectL, SizeL, XForm};

use super::parser::EmfHeader;

/// EMR_EOF contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EofRecord {
    /// Optional trailing palette
    pub palette: Vec<PaletteEntry>,
}

/// One decoded record
///
/// The variant is chosen from the record's type tag at decode time; 16-bit
/// poly variants share the variant of their 32-bit counterpart.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(EmfHeader),
    Eof(EofRecord),

    // Mapping
    SetMapMode(u32),
    SetWindowExtEx(SizeL),
    SetWindowOrgEx(PointL),
    SetViewportExtEx(SizeL),
    SetViewportOrgEx(PointL),
    SetWorldTransform(XForm),
    ModifyWorldTransform { xform: XForm, mode: u32 },

    // State
    SetBkMode(u32),
    SetPolyFillMode(u32),
    SetTextAlign(u32),
    SetTextColor(ColorRef),
    SetBkColor(ColorRef),
    SaveDc,
    /// Negative values are relative to the top of the saved stack
    RestoreDc(i32),
    MoveToEx(PointL),

    // Clipping
    ExcludeClipRect(RectL),
    IntersectClipRect(RectL),
    /// Region is `None` when the record carries no region data
    ExtSelectClipRgn { mode: u32, region: Option<RegionData> },

    // Objects
    CreatePen { handle: u32, pen: LogPen },
    ExtCreatePen { handle: u32, pen: ExtLogPen },
    CreateBrushIndirect { handle: u32, brush: LogBrush },
    CreateDibPatternBrushPt { handle: u32, usage: u32, dib: Dib },
    ExtCreateFontIndirectW { handle: u32, font: LogFont },
    CreatePalette { handle: u32, palette: LogPalette },
    SelectObject(u32),
    SelectPalette(u32),
    DeleteObject(u32),

    // Drawing
    SetPixelV { point: PointL, color: ColorRef },
    LineTo(PointL),
    Rectangle(RectL),
    Ellipse(RectL),
    PolyBezier(Poly),
    Polygon(Poly),
    Polyline(Poly),
    PolyBezierTo(Poly),
    PolylineTo(Poly),
    PolyPolyline(PolyPoly),
    PolyPolygon(PolyPoly),

    // Bitmaps
    BitBlt(BitBlt),
    StretchBlt(BitBlt),
    StretchDiBits(BitBlt),

    // Text
    ExtTextOutA(ExtTextOut),
    ExtTextOutW(ExtTextOut),

    /// Any record the decoder does not interpret
    Skip { record_type: u32, size: u32 },
}

impl Record {
    /// Handle of the object this record creates, if it is a create record
    pub fn created_handle(&self) -> Option<u32> {
        match self {
            Record::CreatePen { handle, .. }
            | Record::ExtCreatePen { handle, .. }
            | Record::CreateBrushIndirect { handle, .. }
            | Record::CreateDibPatternBrushPt { handle, .. }
            | Record::ExtCreateFontIndirectW { handle, .. }
            | Record::CreatePalette { handle, .. } => Some(*handle),
            _ => None,
        }
    }

    /// Short name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Record::Header(_) => "EMR_HEADER",
            Record::Eof(_) => "EMR_EOF",
            Record::SetMapMode(_) => "EMR_SETMAPMODE",
            Record::SetWindowExtEx(_) => "EMR_SETWINDOWEXTEX",
            Record::SetWindowOrgEx(_) => "EMR_SETWINDOWORGEX",
            Record::SetViewportExtEx(_) => "EMR_SETVIEWPORTEXTEX",
            Record::SetViewportOrgEx(_) => "EMR_SETVIEWPORTORGEX",
            Record::SetWorldTransform(_) => "EMR_SETWORLDTRANSFORM",
            Record::ModifyWorldTransform { .. } => "EMR_MODIFYWORLDTRANSFORM",
            Record::SetBkMode(_) => "EMR_SETBKMODE",
            Record::SetPolyFillMode(_) => "EMR_SETPOLYFILLMODE",
            Record::SetTextAlign(_) => "EMR_SETTEXTALIGN",
            Record::SetTextColor(_) => "EMR_SETTEXTCOLOR",
            Record::SetBkColor(_) => "EMR_SETBKCOLOR",
            Record::SaveDc => "EMR_SAVEDC",
            Record::RestoreDc(_) => "EMR_RESTOREDC",
            Record::MoveToEx(_) => "EMR_MOVETOEX",
            Record::ExcludeClipRect(_) => "EMR_EXCLUDECLIPRECT",
            Record::IntersectClipRect(_) => "EMR_INTERSECTCLIPRECT",
            Record::ExtSelectClipRgn { .. } => "EMR_EXTSELECTCLIPRGN",
            Record::CreatePen { .. } => "EMR_CREATEPEN",
            Record::ExtCreatePen { .. } => "EMR_EXTCREATEPEN",
            Record::CreateBrushIndirect { .. } => "EMR_CREATEBRUSHINDIRECT",
            Record::CreateDibPatternBrushPt { .. } => "EMR_CREATEDIBPATTERNBRUSHPT",
            Record::ExtCreateFontIndirectW { .. } => "EMR_EXTCREATEFONTINDIRECTW",
            Record::CreatePalette { .. } => "EMR_CREATEPALETTE",
            Record::SelectObject(_) => "EMR_SELECTOBJECT",
            Record::SelectPalette(_) => "EMR_SELECTPALETTE",
            Record::DeleteObject(_) => "EMR_DELETEOBJECT",
            Record::SetPixelV { .. } => "EMR_SETPIXELV",
            Record::LineTo(_) => "EMR_LINETO",
            Record::Rectangle(_) => "EMR_RECTANGLE",
            Record::Ellipse(_) => "EMR_ELLIPSE",
            Record::PolyBezier(_) => "EMR_POLYBEZIER",
            Record::Polygon(_) => "EMR_POLYGON",
            Record::Polyline(_) => "EMR_POLYLINE",
            Record::PolyBezierTo(_) => "EMR_POLYBEZIERTO",
            Record::PolylineTo(_) => "EMR_POLYLINETO",
            Record::PolyPolyline(_) => "EMR_POLYPOLYLINE",
            Record::PolyPolygon(_) => "EMR_POLYPOLYGON",
            Record::BitBlt(_) => "EMR_BITBLT",
            Record::StretchBlt(_) => "EMR_STRETCHBLT",
            Record::StretchDiBits(_) => "EMR_STRETCHDIBITS",
            Record::ExtTextOutA(_) => "EMR_EXTTEXTOUTA",
            Record::ExtTextOutW(_) => "EMR_EXTTEXTOUTW",
            Record::Skip { .. } => "unsupported",
        }
    }
}
