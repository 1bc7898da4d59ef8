/// EMF Object Creation Records
///
/// Records for creating GDI objects: pens, brushes, fonts, palettes
use super::types::ColorRef;
use zerocopy::FromBytes;

// Pen creation

/// Pen styles
pub mod pen_style {
    pub const SOLID: u32 = 0;
    pub const DASH: u32 = 1;
    pub const DOT: u32 = 2;
    pub const DASHDOT: u32 = 3;
    pub const DASHDOTDOT: u32 = 4;
    pub const NULL: u32 = 5;
    pub const INSIDEFRAME: u32 = 6;
    pub const USERSTYLE: u32 = 7;
    pub const ALTERNATE: u32 = 8;
    pub const STYLE_MASK: u32 = 0x0000000F;

    // End cap styles
    pub const ENDCAP_ROUND: u32 = 0x00000000;
    pub const ENDCAP_SQUARE: u32 = 0x00000100;
    pub const ENDCAP_FLAT: u32 = 0x00000200;
    pub const ENDCAP_MASK: u32 = 0x00000F00;

    // Join styles
    pub const JOIN_ROUND: u32 = 0x00000000;
    pub const JOIN_BEVEL: u32 = 0x00001000;
    pub const JOIN_MITER: u32 = 0x00002000;
    pub const JOIN_MASK: u32 = 0x0000F000;
}

/// EMR_CREATEPEN
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrCreatePen {
    pub record_type: u32,
    pub record_size: u32,
    pub object_index: u32,
    pub pen_style: u32,
    pub width: i32,   // Only x component used
    pub _unused: i32, // y component
    pub color: ColorRef,
}

/// EMR_EXTCREATEPEN header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrExtCreatePenHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub object_index: u32,
    pub off_bmi: u32,
    pub cb_bmi: u32,
    pub off_bits: u32,
    pub cb_bits: u32,
    pub pen_style: u32,
    pub width: u32,
    pub brush_style: u32,
    pub color: ColorRef,
    pub brush_hatch: u32,
    pub num_style_entries: u32,
    // Followed by style entries if USERSTYLE
}

/// Decoded LOGPEN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPen {
    pub style: u32,
    pub width: i32,
    pub color: ColorRef,
}

/// Decoded LOGPENEX
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtLogPen {
    pub style: u32,
    pub width: u32,
    pub brush_style: u32,
    pub color: ColorRef,
    pub hatch: u32,
    /// Dash and gap lengths in logical units; only present for `PS_USERSTYLE`
    pub style_entries: Vec<u32>,
}

// Brush creation

/// Brush styles
pub mod brush_style {
    pub const SOLID: u32 = 0;
    pub const NULL: u32 = 1;
    pub const HATCHED: u32 = 2;
    pub const PATTERN: u32 = 3;
    pub const DIBPATTERN: u32 = 5;
    pub const DIBPATTERNPT: u32 = 6;
}

/// EMR_CREATEBRUSHINDIRECT
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrCreateBrushIndirect {
    pub record_type: u32,
    pub record_size: u32,
    pub object_index: u32,
    pub brush_style: u32,
    pub color: ColorRef,
    pub brush_hatch: u32,
}

/// Decoded LOGBRUSH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBrush {
    pub style: u32,
    pub color: ColorRef,
    pub hatch: u32,
}

/// EMR_CREATEDIBPATTERNBRUSHPT header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrCreateDibPatternBrushPtHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub object_index: u32,
    pub usage: u32,
    pub off_bmi: u32,
    pub cb_bmi: u32,
    pub off_bits: u32,
    pub cb_bits: u32,
}

// Font creation

/// Font weight constants
pub mod font_weight {
    pub const NORMAL: i32 = 400;
    pub const BOLD: i32 = 700;
}

/// Maximum font face name length
pub const LF_FACESIZE: usize = 32;

/// EMR_EXTCREATEFONTINDIRECTW header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrExtCreateFontIndirectWHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub object_index: u32,
    pub log_font: LogFontW,
    // Optionally followed by the LOGFONTEXW/DV tail, which is ignored
}

/// LOGFONTW structure
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct LogFontW {
    pub height: i32,
    pub width: i32,
    pub escapement: i32,
    pub orientation: i32,
    pub weight: i32,
    pub italic: u8,
    pub underline: u8,
    pub strike_out: u8,
    pub char_set: u8,
    pub out_precision: u8,
    pub clip_precision: u8,
    pub quality: u8,
    pub pitch_and_family: u8,
    pub face_name: [u16; LF_FACESIZE],
}

/// Decoded logical font
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFont {
    /// Character cell height; negative values give the em height
    pub height: i32,
    pub width: i32,
    /// Angle of the baseline in tenths of a degree, counter-clockwise
    pub escapement: i32,
    pub orientation: i32,
    pub weight: i32,
    pub italic: bool,
    pub underline: bool,
    pub strike_out: bool,
    pub charset: u8,
    pub face_name: String,
}

impl From<&LogFontW> for LogFont {
    fn from(raw: &LogFontW) -> Self {
        let len = raw
            .face_name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(LF_FACESIZE);
        Self {
            height: raw.height,
            width: raw.width,
            escapement: raw.escapement,
            orientation: raw.orientation,
            weight: raw.weight,
            italic: raw.italic != 0,
            underline: raw.underline != 0,
            strike_out: raw.strike_out != 0,
            charset: raw.char_set,
            face_name: String::from_utf16_lossy(&raw.face_name[..len]),
        }
    }
}

impl Default for LogFont {
    /// The DEVICE_DEFAULT_FONT stand-in
    fn default() -> Self {
        Self {
            height: 16,
            width: 0,
            escapement: 0,
            orientation: 0,
            weight: font_weight::NORMAL,
            italic: false,
            underline: false,
            strike_out: false,
            charset: 1,
            face_name: "Arial".to_string(),
        }
    }
}

// Palette operations

/// EMR_CREATEPALETTE header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrCreatePaletteHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub object_index: u32,
    pub version: u16, // Always 0x0300
    pub num_entries: u16,
    // Followed by num_entries LOGPALETTEENTRY structures
}

/// LOGPALETTEENTRY as stored in EMF palettes
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes)]
#[repr(C)]
pub struct PaletteEntry {
    pub reserved: u8,
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

/// Decoded LOGPALETTE
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPalette {
    pub entries: Vec<PaletteEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logfont_face_name() {
        let mut face_name = [0u16; LF_FACESIZE];
        for (slot, unit) in face_name.iter_mut().zip("Consolas".encode_utf16()) {
            *slot = unit;
        }
        let raw = LogFontW {
            height: -24,
            width: 0,
            escapement: 900,
            orientation: 900,
            weight: font_weight::BOLD,
            italic: 1,
            underline: 0,
            strike_out: 0,
            char_set: 0,
            out_precision: 0,
            clip_precision: 0,
            quality: 0,
            pitch_and_family: 0,
            face_name,
        };
        let font = LogFont::from(&raw);
        assert_eq!(font.face_name, "Consolas");
        assert!(font.italic);
        assert!(!font.underline);
        assert_eq!(font.escapement, 900);
    }

    #[test]
    fn test_unterminated_face_name() {
        let raw = LogFontW::read_from_bytes(&[0x41u8; 92][..]).unwrap();
        assert_eq!(LogFont::from(&raw).face_name.chars().count(), LF_FACESIZE);
    }
}
