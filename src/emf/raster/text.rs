// Glyph rendering for ExtTextOut records
//
// Outlines come from ttf-parser and are filled through tiny-skia. Placement
// follows the advance array stored in the metafile; the face only supplies
// outlines, vertical metrics and advances for runs recorded without one.

use super::{Canvas, DevicePoint, polyline_path};
use crate::common::error::{Error, Result};
use crate::emf::device_context::TextAlign;
use crate::emf::records::types::ColorRef;
use std::ops::Range;
use tiny_skia::{FillRule, Mask, Path, PathBuilder, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// Em size in pixels when the logical font asks for the default height
const DEFAULT_EM: f32 = 12.0;

/// Collects a glyph outline in font units
struct GlyphPathBuilder(PathBuilder);

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}

/// Vertical metrics of a face, in font units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMetrics {
    pub units_per_em: f32,
    pub ascender: f32,
    /// Negative below the baseline
    pub descender: f32,
}

impl FaceMetrics {
    pub fn of(face: &Face<'_>) -> Self {
        Self {
            units_per_em: face.units_per_em().max(1) as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
        }
    }

    /// Em size in pixels for a LOGFONT height already in device units.
    ///
    /// Negative heights are the em size itself; positive heights are the
    /// character cell (ascender to descender).
    pub fn em_size(&self, height: f32) -> f32 {
        if height < 0.0 {
            -height
        } else if height > 0.0 {
            let cell = self.ascender - self.descender;
            if cell > 0.0 {
                height * self.units_per_em / cell
            } else {
                height
            }
        } else {
            DEFAULT_EM
        }
    }
}

/// A character, or a raw glyph index with `ETO_GLYPH_INDEX`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextUnit {
    Char(char),
    Glyph(u16),
}

/// Split code units into drawable units.
///
/// Each unit comes with the range of code units it spans, which is also its
/// range in the advance array: a surrogate pair takes two entries.
pub fn text_units(code_units: &[u16], glyph_indices: bool) -> Vec<(TextUnit, Range<usize>)> {
    if glyph_indices {
        return code_units
            .iter()
            .enumerate()
            .map(|(i, &id)| (TextUnit::Glyph(id), i..i + 1))
            .collect();
    }

    let mut units = Vec::with_capacity(code_units.len());
    let mut start = 0;
    for decoded in char::decode_utf16(code_units.iter().copied()) {
        let (ch, len) = match decoded {
            Ok(ch) => (ch, ch.len_utf16()),
            Err(_) => (char::REPLACEMENT_CHARACTER, 1),
        };
        units.push((TextUnit::Char(ch), start..start + len));
        start += len;
    }
    units
}

/// Unit vectors along the baseline and down from it, for a baseline turned
/// `degrees` counter-clockwise on a y-down raster
pub fn baseline_axes(degrees: f32) -> (DevicePoint, DevicePoint) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    ((cos, -sin), (sin, cos))
}

/// Where the first glyph's baseline origin sits relative to the reference
/// point, as (along the baseline, down from it).
///
/// `ascent` and `descent` are both positive pixel distances from the baseline.
pub fn alignment_offset(align: TextAlign, width: f32, ascent: f32, descent: f32) -> (f32, f32) {
    let along = if align.is_center() {
        -width / 2.0
    } else if align.is_right() {
        -width
    } else {
        0.0
    };
    let down = if align.is_baseline() {
        0.0
    } else if align.is_bottom() {
        -descent
    } else {
        ascent
    };
    (along, down)
}

/// One run of text in device space
#[derive(Debug, Clone)]
pub struct TextRun<'a> {
    pub code_units: &'a [u16],
    pub glyph_indices: bool,
    /// Advance per code unit in pixels; empty to use the face's advances
    pub advances: &'a [f32],
    pub reference: DevicePoint,
    pub align: TextAlign,
    /// Baseline angle in degrees, counter-clockwise
    pub escapement: f32,
    /// LOGFONT height mapped to pixels, sign preserved
    pub height: f32,
    pub underline: bool,
    pub strike_out: bool,
    pub color: ColorRef,
    /// Fill behind the character cells
    pub background: Option<ColorRef>,
}

/// Draw a run with the given font file and return its advance width in pixels.
pub fn draw_text(canvas: &mut Canvas, font: &[u8], run: &TextRun<'_>, clip: Option<&Mask>) -> Result<f32> {
    let face = Face::parse(font, 0).map_err(|err| Error::Drawing(format!("font does not parse: {err}")))?;
    let metrics = FaceMetrics::of(&face);
    let scale = metrics.em_size(run.height) / metrics.units_per_em;

    let glyphs: Vec<(GlyphId, f32)> = text_units(run.code_units, run.glyph_indices)
        .into_iter()
        .map(|(unit, span)| {
            let glyph = match unit {
                TextUnit::Glyph(id) => GlyphId(id),
                TextUnit::Char(ch) => face.glyph_index(ch).unwrap_or(GlyphId(0)),
            };
            let advance = match run.advances.get(span) {
                Some(entries) if !entries.is_empty() => entries.iter().sum(),
                _ => face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale,
            };
            (glyph, advance)
        })
        .collect();
    let width: f32 = glyphs.iter().map(|(_, advance)| advance).sum();

    let ascent = metrics.ascender * scale;
    let descent = -metrics.descender * scale;
    let (u, n) = baseline_axes(run.escapement);
    let (along, down) = alignment_offset(run.align, width, ascent, descent);
    // `s` along the baseline from the first origin, `t` down from the baseline
    let at = |s: f32, t: f32| -> DevicePoint {
        (
            run.reference.0 + u.0 * (along + s) + n.0 * (down + t),
            run.reference.1 + u.1 * (along + s) + n.1 * (down + t),
        )
    };

    if let Some(background) = run.background
        && let Some(path) = band(&at, width, -ascent, descent)
    {
        let paint = canvas.solid_paint(background);
        canvas.fill_path(&path, &paint, FillRule::Winding, clip);
    }

    let paint = canvas.solid_paint(run.color);
    let mut pen = 0.0;
    for (glyph, advance) in glyphs {
        let mut builder = GlyphPathBuilder(PathBuilder::new());
        if face.outline_glyph(glyph, &mut builder).is_some()
            && let Some(path) = builder.0.finish()
        {
            let (x, y) = at(pen, 0.0);
            let transform = Transform::from_scale(scale, -scale)
                .post_rotate(-run.escapement)
                .post_translate(x, y);
            canvas.fill_path_transformed(&path, &paint, transform, clip);
        }
        pen += advance;
    }

    let mut rules = Vec::new();
    if run.underline {
        let (position, thickness) = face
            .underline_metrics()
            .map(|m| (m.position as f32, m.thickness as f32))
            .unwrap_or((-metrics.units_per_em / 10.0, metrics.units_per_em / 20.0));
        rules.push((position, thickness));
    }
    if run.strike_out {
        let (position, thickness) = face
            .strikeout_metrics()
            .map(|m| (m.position as f32, m.thickness as f32))
            .unwrap_or((metrics.ascender * 0.3, metrics.units_per_em / 20.0));
        rules.push((position, thickness));
    }
    for (position, thickness) in rules {
        // Font positions grow upwards
        let center = -position * scale;
        let half = (thickness * scale).max(1.0) / 2.0;
        if let Some(path) = band(&at, width, center - half, center + half) {
            canvas.fill_path(&path, &paint, FillRule::Winding, clip);
        }
    }

    Ok(width)
}

/// Quadrilateral spanning the run between two distances below the baseline
fn band(at: &impl Fn(f32, f32) -> DevicePoint, width: f32, top: f32, bottom: f32) -> Option<Path> {
    polyline_path(
        &[at(0.0, top), at(width, top), at(width, bottom), at(0.0, bottom)],
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRICS: FaceMetrics = FaceMetrics {
        units_per_em: 1000.0,
        ascender: 800.0,
        descender: -200.0,
    };

    fn close(a: DevicePoint, b: DevicePoint) -> bool {
        (a.0 - b.0).abs() < 1e-5 && (a.1 - b.1).abs() < 1e-5
    }

    #[test]
    fn test_em_size_from_logfont_height() {
        assert_eq!(METRICS.em_size(-24.0), 24.0);
        // Cell height 1000 units maps onto an em of 1000 units
        assert_eq!(METRICS.em_size(20.0), 20.0);
        let tall = FaceMetrics {
            ascender: 1500.0,
            descender: -500.0,
            ..METRICS
        };
        assert_eq!(tall.em_size(20.0), 10.0);
        assert_eq!(METRICS.em_size(0.0), DEFAULT_EM);
    }

    #[test]
    fn test_surrogate_pairs_span_two_advances() {
        let units: Vec<u16> = "a😀b".encode_utf16().collect();
        let split = text_units(&units, false);
        assert_eq!(split.len(), 3);
        assert_eq!(split[0], (TextUnit::Char('a'), 0..1));
        assert_eq!(split[1], (TextUnit::Char('😀'), 1..3));
        assert_eq!(split[2], (TextUnit::Char('b'), 3..4));
    }

    #[test]
    fn test_unpaired_surrogate_is_replaced() {
        let split = text_units(&[0xD800, 0x0041], false);
        assert_eq!(split[0], (TextUnit::Char(char::REPLACEMENT_CHARACTER), 0..1));
        assert_eq!(split[1], (TextUnit::Char('A'), 1..2));
    }

    #[test]
    fn test_glyph_index_units() {
        let split = text_units(&[0xD800, 7], true);
        assert_eq!(split, vec![(TextUnit::Glyph(0xD800), 0..1), (TextUnit::Glyph(7), 1..2)]);
    }

    #[test]
    fn test_baseline_axes() {
        let (u, n) = baseline_axes(0.0);
        assert!(close(u, (1.0, 0.0)));
        assert!(close(n, (0.0, 1.0)));
        // Rotated a quarter turn the baseline points up the raster
        let (u, n) = baseline_axes(90.0);
        assert!(close(u, (0.0, -1.0)));
        assert!(close(n, (1.0, 0.0)));
    }

    #[test]
    fn test_alignment_offsets() {
        let top_left = TextAlign::empty();
        assert_eq!(alignment_offset(top_left, 40.0, 8.0, 2.0), (0.0, 8.0));
        assert_eq!(
            alignment_offset(TextAlign::RIGHT | TextAlign::BASELINE, 40.0, 8.0, 2.0),
            (-40.0, 0.0)
        );
        assert_eq!(
            alignment_offset(TextAlign::CENTER | TextAlign::BOTTOM, 40.0, 8.0, 2.0),
            (-20.0, -2.0)
        );
    }

    #[test]
    fn test_unparseable_font() {
        let mut canvas = Canvas::new(4, 4, ColorRef::WHITE, true).unwrap();
        let units: Vec<u16> = "hi".encode_utf16().collect();
        let run = TextRun {
            code_units: &units,
            glyph_indices: false,
            advances: &[],
            reference: (0.0, 0.0),
            align: TextAlign::empty(),
            escapement: 0.0,
            height: -12.0,
            underline: false,
            strike_out: false,
            color: ColorRef::BLACK,
            background: None,
        };
        assert!(matches!(
            draw_text(&mut canvas, b"not a font", &run, None),
            Err(Error::Drawing(_))
        ));
    }
}
