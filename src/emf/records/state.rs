/// EMF State Management Records
///
/// Records for managing device context state: transforms, mapping modes,
/// colours and clipping.
use super::types::{PointL, RectL, SizeL, XForm};
use zerocopy::FromBytes;

/// Record carrying a single 32-bit value
///
/// EMR_SETMAPMODE, EMR_SETBKMODE, EMR_SETPOLYFILLMODE, EMR_SETTEXTALIGN,
/// EMR_SETTEXTCOLOR, EMR_SETBKCOLOR, EMR_RESTOREDC, EMR_SELECTOBJECT,
/// EMR_DELETEOBJECT and EMR_SELECTPALETTE all share this layout.
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrValue {
    pub record_type: u32,
    pub record_size: u32,
    pub value: u32,
}

/// EMR_SETWINDOWORGEX, EMR_SETVIEWPORTORGEX, EMR_MOVETOEX, EMR_LINETO
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrPoint {
    pub record_type: u32,
    pub record_size: u32,
    pub point: PointL,
}

/// EMR_SETWINDOWEXTEX, EMR_SETVIEWPORTEXTEX
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrSize {
    pub record_type: u32,
    pub record_size: u32,
    pub size: SizeL,
}

/// EMR_EXCLUDECLIPRECT, EMR_INTERSECTCLIPRECT, EMR_RECTANGLE, EMR_ELLIPSE
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrRect {
    pub record_type: u32,
    pub record_size: u32,
    pub rect: RectL,
}

// Transform records

/// EMR_SETWORLDTRANSFORM
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrSetWorldTransform {
    pub record_type: u32,
    pub record_size: u32,
    pub xform: XForm,
}

/// Modify world transform mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ModifyWorldTransformMode {
    /// Reset to identity
    Identity = 1,
    /// New transform applied before the current one
    LeftMultiply = 2,
    /// New transform applied after the current one
    RightMultiply = 3,
    /// Replace the current transform
    Set = 4,
}

impl ModifyWorldTransformMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Identity),
            2 => Some(Self::LeftMultiply),
            3 => Some(Self::RightMultiply),
            4 => Some(Self::Set),
            _ => None,
        }
    }
}

/// EMR_MODIFYWORLDTRANSFORM
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrModifyWorldTransform {
    pub record_type: u32,
    pub record_size: u32,
    pub xform: XForm,
    pub mode: u32,
}

// Mapping mode records

/// Mapping mode enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MapMode {
    /// Text mode (1:1, not constrained)
    Text = 1,
    /// Low res (.1 mm per unit)
    LoMetric = 2,
    /// High res (.01 mm per unit)
    HiMetric = 3,
    /// Low res (.01 in per unit)
    LoEnglish = 4,
    /// High res (.001 in per unit)
    HiEnglish = 5,
    /// Twips (1/1440 in per unit)
    Twips = 6,
    /// Isotropic (x == y scaling)
    Isotropic = 7,
    /// Anisotropic (arbitrary scaling)
    Anisotropic = 8,
}

impl MapMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Text),
            2 => Some(Self::LoMetric),
            3 => Some(Self::HiMetric),
            4 => Some(Self::LoEnglish),
            5 => Some(Self::HiEnglish),
            6 => Some(Self::Twips),
            7 => Some(Self::Isotropic),
            8 => Some(Self::Anisotropic),
            _ => None,
        }
    }

    /// Whether the scale comes from the viewport/window extent ratio
    #[inline]
    pub fn uses_viewport_extent(self) -> bool {
        matches!(self, Self::Isotropic | Self::Anisotropic)
    }
}

// Clipping

/// Region combination modes for EMR_EXTSELECTCLIPRGN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RegionMode {
    And = 1,
    Or = 2,
    Xor = 3,
    Diff = 4,
    Copy = 5,
}

impl RegionMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::And),
            2 => Some(Self::Or),
            3 => Some(Self::Xor),
            4 => Some(Self::Diff),
            5 => Some(Self::Copy),
            _ => None,
        }
    }
}

/// EMR_EXTSELECTCLIPRGN header
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrExtSelectClipRgnHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub rgn_data_size: u32,
    pub region_mode: u32,
    // Followed by RGNDATA when rgn_data_size > 0
}

/// RGNDATAHEADER
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct RegionDataHeader {
    pub size: u32,
    pub region_type: u32,
    pub count_rects: u32,
    pub rgn_size: u32,
    pub bounds: RectL,
}

/// Decoded RGNDATA: a union of device-space rectangles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionData {
    pub bounds: RectL,
    pub rects: Vec<RectL>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_mode_families() {
        assert!(MapMode::Isotropic.uses_viewport_extent());
        assert!(MapMode::Anisotropic.uses_viewport_extent());
        assert!(!MapMode::Twips.uses_viewport_extent());
        assert_eq!(MapMode::from_u32(9), None);
    }

    #[test]
    fn test_region_mode() {
        assert_eq!(RegionMode::from_u32(5), Some(RegionMode::Copy));
        assert_eq!(RegionMode::from_u32(0), None);
    }
}
