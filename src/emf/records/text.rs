/// EMF Text Output Records
use super::types::{PointL, RectL};
use bitflags::bitflags;
use zerocopy::FromBytes;

bitflags! {
    /// ExtTextOut options (ETO_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextOptions: u32 {
        /// Fill the clipping rectangle with the background colour
        const OPAQUE = 0x0002;
        /// Clip glyphs to the rectangle
        const CLIPPED = 0x0004;
        /// Code units are glyph indices, not characters
        const GLYPH_INDEX = 0x0010;
        const RTLREADING = 0x0080;
        const NO_RECT = 0x0100;
        /// Advance array holds an (x, y) pair per character
        const PDY = 0x2000;

        const _ = !0;
    }
}

/// EMR_EXTTEXTOUTA / EMR_EXTTEXTOUTW header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrExtTextOutHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub bounds: RectL,
    pub graphics_mode: u32,
    pub ex_scale: f32,
    pub ey_scale: f32,
    pub text: EmrTextInfo,
}

/// EMRTEXT structure
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrTextInfo {
    pub reference: PointL,
    pub num_chars: u32,
    /// Offset of the string from the start of the record
    pub off_string: u32,
    pub options: u32,
    pub rectangle: RectL,
    /// Offset of the advance array from the start of the record
    pub off_dx: u32,
}

/// Decoded EMRTEXT payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmrText {
    /// Logical reference point
    pub reference: PointL,
    pub options: TextOptions,
    /// Clipping/opaquing rectangle in logical units
    pub rectangle: RectL,
    /// UTF-16 code units (or glyph indices with `GLYPH_INDEX`); ANSI strings
    /// are decoded from Windows-1252 first
    pub code_units: Vec<u16>,
    /// Per-character advance along the baseline, logical units
    pub dx: Vec<i32>,
    /// Per-character vertical advance, only present with `PDY`
    pub dy: Vec<i32>,
}

impl EmrText {
    #[inline]
    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    /// The string as text, replacing unpaired surrogates
    pub fn text(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }
}

/// Decoded EMR_EXTTEXTOUTA / EMR_EXTTEXTOUTW
#[derive(Debug, Clone, PartialEq)]
pub struct ExtTextOut {
    pub bounds: RectL,
    pub graphics_mode: u32,
    pub ex_scale: f32,
    pub ey_scale: f32,
    pub text: EmrText,
}
