/// EMF Drawing Records
///
/// Poly records come in 32-bit (POINTL) and 16-bit (POINTS) variants with the
/// same header; both decode to [`Poly`] with widened points.
use super::types::{ColorRef, PointL, RectL};
use zerocopy::FromBytes;

/// EMR_POLYGON, EMR_POLYLINE, EMR_POLYBEZIER, EMR_POLYBEZIERTO,
/// EMR_POLYLINETO and their 16-bit variants
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrPolyHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub bounds: RectL,
    pub count: u32,
    // Followed by count points
}

/// EMR_POLYPOLYGON, EMR_POLYPOLYLINE and their 16-bit variants
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrPolyPolyHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub bounds: RectL,
    pub num_polys: u32,
    pub count: u32,
    // Followed by num_polys counts, then count points
}

/// EMR_SETPIXELV
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub struct EmrSetPixelV {
    pub record_type: u32,
    pub record_size: u32,
    pub point: PointL,
    pub color: ColorRef,
}

/// Decoded single poly record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    pub bounds: RectL,
    pub points: Vec<PointL>,
}

/// Decoded poly-poly record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyPoly {
    pub bounds: RectL,
    /// Point count of each figure; sums to `points.len()`
    pub counts: Vec<u32>,
    pub points: Vec<PointL>,
}

impl PolyPoly {
    /// Iterate the individual figures
    pub fn figures(&self) -> impl Iterator<Item = &[PointL]> {
        let mut start = 0usize;
        self.counts.iter().map(move |&count| {
            let end = start + count as usize;
            let figure = &self.points[start..end];
            start = end;
            figure
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_figures_split() {
        let poly = PolyPoly {
            bounds: RectL::default(),
            counts: vec![2, 0, 3],
            points: (0..5).map(|i| PointL::new(i, i)).collect(),
        };
        let figures: Vec<_> = poly.figures().collect();
        assert_eq!(figures.len(), 3);
        assert_eq!(figures[0].len(), 2);
        assert!(figures[1].is_empty());
        assert_eq!(figures[2][0], PointL::new(2, 2));
    }
}
