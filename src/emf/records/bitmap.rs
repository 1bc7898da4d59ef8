/// EMF Bitmap Operation Records
use super::types::{ColorRef, RectL, XForm};
use zerocopy::FromBytes;

/// Common raster operations (ternary ROP codes)
pub mod rop {
    pub const SRCCOPY: u32 = 0x00CC0020; // dest = source
    pub const SRCPAINT: u32 = 0x00EE0086; // dest = source OR dest
    pub const SRCAND: u32 = 0x008800C6; // dest = source AND dest
    pub const SRCINVERT: u32 = 0x00660046; // dest = source XOR dest
    pub const SRCERASE: u32 = 0x00440328; // dest = source AND (NOT dest)
    pub const NOTSRCCOPY: u32 = 0x00330008; // dest = (NOT source)
    pub const NOTSRCERASE: u32 = 0x001100A6; // dest = (NOT src) AND (NOT dest)
    pub const MERGECOPY: u32 = 0x00C000CA; // dest = (source AND pattern)
    pub const MERGEPAINT: u32 = 0x00BB0226; // dest = (NOT source) OR dest
    pub const PATCOPY: u32 = 0x00F00021; // dest = pattern
    pub const PATINVERT: u32 = 0x005A0049; // dest = pattern XOR dest
    pub const DSTINVERT: u32 = 0x00550009; // dest = (NOT dest)
    pub const BLACKNESS: u32 = 0x00000042; // dest = BLACK
    pub const WHITENESS: u32 = 0x00FF0062; // dest = WHITE
}

/// EMR_BITBLT header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrBitBltHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub bounds: RectL,
    pub x_dest: i32,
    pub y_dest: i32,
    pub cx_dest: i32,
    pub cy_dest: i32,
    pub rop: u32,
    pub x_src: i32,
    pub y_src: i32,
    pub xform_src: XForm,
    pub bk_color_src: ColorRef,
    pub usage_src: u32,
    pub off_bmi_src: u32,
    pub cb_bmi_src: u32,
    pub off_bits_src: u32,
    pub cb_bits_src: u32,
    // Followed by bitmap data if present
}

/// EMR_STRETCHBLT header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrStretchBltHeader {
    pub blt: EmrBitBltHeader,
    pub cx_src: i32,
    pub cy_src: i32,
    // Followed by bitmap data if present
}

/// EMR_STRETCHDIBITS header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrStretchDiBitsHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub bounds: RectL,
    pub x_dest: i32,
    pub y_dest: i32,
    pub x_src: i32,
    pub y_src: i32,
    pub cx_src: i32,
    pub cy_src: i32,
    pub off_bmi_src: u32,
    pub cb_bmi_src: u32,
    pub off_bits_src: u32,
    pub cb_bits_src: u32,
    pub usage_src: u32,
    pub rop: u32,
    pub cx_dest: i32,
    pub cy_dest: i32,
    // Followed by bitmap data
}

/// BITMAPINFOHEADER
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes)]
#[repr(C)]
pub struct BitmapInfoHeader {
    pub size: u32,
    pub width: i32,
    /// Positive for bottom-up rows, negative for top-down
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
}

/// Size of [`BitmapInfoHeader`] on disk
pub const BITMAPINFOHEADER_SIZE: usize = 40;

/// Bitmap compression types
pub mod compression {
    pub const BI_RGB: u32 = 0;
    pub const BI_RLE8: u32 = 1;
    pub const BI_RLE4: u32 = 2;
    pub const BI_BITFIELDS: u32 = 3;
    pub const BI_JPEG: u32 = 4;
    pub const BI_PNG: u32 = 5;
}

/// A device-independent bitmap lifted out of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dib {
    pub header: BitmapInfoHeader,
    /// Raw colour table following the header, if any
    pub color_table: Vec<u8>,
    /// Pixel bytes exactly as declared by the record's bits size field
    pub bits: Vec<u8>,
}

impl Dib {
    #[inline]
    pub fn width(&self) -> i32 {
        self.header.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.header.height.unsigned_abs()
    }

    #[inline]
    pub fn is_bottom_up(&self) -> bool {
        self.header.height > 0
    }
}

/// Decoded bit-block transfer
///
/// EMR_BITBLT, EMR_STRETCHBLT and EMR_STRETCHDIBITS all reduce to this shape;
/// for EMR_BITBLT the source extent equals the destination extent.
#[derive(Debug, Clone, PartialEq)]
pub struct BitBlt {
    pub bounds: RectL,
    pub x_dest: i32,
    pub y_dest: i32,
    pub cx_dest: i32,
    pub cy_dest: i32,
    pub x_src: i32,
    pub y_src: i32,
    pub cx_src: i32,
    pub cy_src: i32,
    pub rop: u32,
    pub xform_src: XForm,
    pub bk_color_src: ColorRef,
    pub usage_src: u32,
    /// Source bitmap; absent for pattern-only operations
    pub source: Option<Dib>,
}
