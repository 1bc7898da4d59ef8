//! Test-only EMF stream builder.

use super::parser::EmfHeader;
use super::records::types::EmrType;

/// Little-endian byte accumulator for record bodies
#[derive(Debug, Default, Clone)]
pub struct Body(Vec<u8>);

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i16(mut self, v: i16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn rect(self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.i32(left).i32(top).i32(right).i32(bottom)
    }

    pub fn zeros(mut self, n: usize) -> Self {
        self.0.resize(self.0.len() + n, 0);
        self
    }

    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.0.extend_from_slice(data);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// A complete record: type, size, then `body`
pub fn raw_record(record_type: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(&record_type.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32 + 8).to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// Builds a header, a list of records and an EOF
#[derive(Debug, Clone)]
pub struct EmfBuilder {
    bounds: [i32; 4],
    description: Vec<u16>,
    records: Vec<u8>,
}

impl EmfBuilder {
    /// Header record size without a description
    pub const HEADER_SIZE: usize = 88;

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            bounds: [left, top, right, bottom],
            description: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = text.encode_utf16().collect();
        self
    }

    pub fn header_bytes(&self) -> Vec<u8> {
        let [left, top, right, bottom] = self.bounds;
        let has_description = !self.description.is_empty();
        let mut body = Body::new()
            .rect(left, top, right, bottom)
            .rect(0, 0, 0, 0)
            .u32(EmfHeader::SIGNATURE)
            .u32(0x10000)
            .u32(0)
            .u32(0)
            .u16(0)
            .u16(0)
            .u32(self.description.len() as u32)
            .u32(if has_description { Self::HEADER_SIZE as u32 } else { 0 })
            .u32(0)
            .i32(1024)
            .i32(768)
            .i32(320)
            .i32(240);
        for &unit in &self.description {
            body = body.u16(unit);
        }
        if body.len() % 4 != 0 {
            body = body.zeros(2);
        }
        raw_record(EmrType::Header as u32, &body.finish())
    }

    pub fn raw(mut self, bytes: Vec<u8>) -> Self {
        self.records.extend(bytes);
        self
    }

    pub fn record(self, record_type: EmrType, body: Body) -> Self {
        self.raw(raw_record(record_type as u32, &body.finish()))
    }

    pub fn finish_without_eof(self) -> Vec<u8> {
        let mut out = self.header_bytes();
        out.extend(self.records);
        out
    }

    pub fn finish(self) -> Vec<u8> {
        let eof = raw_record(
            EmrType::Eof as u32,
            &Body::new().u32(0).u32(16).u32(20).finish(),
        );
        let mut out = self.finish_without_eof();
        out.extend(eof);
        out
    }

    // Record shorthands

    pub fn value(self, record_type: EmrType, value: u32) -> Self {
        self.record(record_type, Body::new().u32(value))
    }

    pub fn point(self, record_type: EmrType, x: i32, y: i32) -> Self {
        self.record(record_type, Body::new().i32(x).i32(y))
    }

    pub fn rect(self, record_type: EmrType, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.record(record_type, Body::new().rect(left, top, right, bottom))
    }

    pub fn move_to(self, x: i32, y: i32) -> Self {
        self.point(EmrType::MoveToEx, x, y)
    }

    pub fn line_to(self, x: i32, y: i32) -> Self {
        self.point(EmrType::LineTo, x, y)
    }

    pub fn rectangle(self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.rect(EmrType::Rectangle, left, top, right, bottom)
    }

    pub fn set_pixel(self, x: i32, y: i32, color: u32) -> Self {
        self.record(EmrType::SetPixelV, Body::new().i32(x).i32(y).u32(color))
    }

    pub fn polygon(self, points: &[(i32, i32)]) -> Self {
        let mut body = Body::new().rect(0, 0, 0, 0).u32(points.len() as u32);
        for &(x, y) in points {
            body = body.i32(x).i32(y);
        }
        self.record(EmrType::Polygon, body)
    }

    pub fn set_map_mode(self, mode: u32) -> Self {
        self.value(EmrType::SetMapMode, mode)
    }

    pub fn window_ext(self, cx: i32, cy: i32) -> Self {
        self.point(EmrType::SetWindowExtEx, cx, cy)
    }

    pub fn viewport_ext(self, cx: i32, cy: i32) -> Self {
        self.point(EmrType::SetViewportExtEx, cx, cy)
    }

    pub fn window_org(self, x: i32, y: i32) -> Self {
        self.point(EmrType::SetWindowOrgEx, x, y)
    }

    pub fn create_pen(self, handle: u32, style: u32, width: i32, color: u32) -> Self {
        self.record(
            EmrType::CreatePen,
            Body::new().u32(handle).u32(style).i32(width).i32(0).u32(color),
        )
    }

    pub fn create_brush(self, handle: u32, style: u32, color: u32) -> Self {
        self.record(
            EmrType::CreateBrushIndirect,
            Body::new().u32(handle).u32(style).u32(color).u32(0),
        )
    }

    pub fn create_font(self, handle: u32, face: &str, height: i32, escapement: i32) -> Self {
        let mut body = Body::new()
            .u32(handle)
            .i32(height)
            .i32(0)
            .i32(escapement)
            .i32(escapement)
            .i32(400)
            .zeros(8);
        let units: Vec<u16> = face.encode_utf16().take(31).collect();
        for &unit in &units {
            body = body.u16(unit);
        }
        body = body.zeros((32 - units.len()) * 2);
        self.record(EmrType::ExtCreateFontIndirectW, body)
    }

    pub fn select_object(self, handle: u32) -> Self {
        self.value(EmrType::SelectObject, handle)
    }

    pub fn delete_object(self, handle: u32) -> Self {
        self.value(EmrType::DeleteObject, handle)
    }

    /// EMR_EXTTEXTOUTW with the advance array before the string
    pub fn text_out(self, x: i32, y: i32, options: u32, text: &str, dx: &[i32]) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        let off_dx = 76u32;
        let off_string = off_dx + 4 * dx.len() as u32;
        let mut body = Body::new()
            .rect(0, 0, -1, -1)
            .u32(1)
            .f32(1.0)
            .f32(1.0)
            .i32(x)
            .i32(y)
            .u32(units.len() as u32)
            .u32(off_string)
            .u32(options)
            .rect(0, 0, 0, 0)
            .u32(if dx.is_empty() { 0 } else { off_dx });
        for &advance in dx {
            body = body.i32(advance);
        }
        for &unit in &units {
            body = body.u16(unit);
        }
        if body.len() % 4 != 0 {
            body = body.zeros(2);
        }
        self.record(EmrType::ExtTextOutW, body)
    }

    /// EMR_STRETCHDIBITS with a 32 bpp BI_RGB bitmap
    ///
    /// `pixels` are BGRX quads, bottom-up when `height > 0`.
    pub fn stretch_dibits(
        self,
        dest: (i32, i32, i32, i32),
        src_width: i32,
        height: i32,
        bit_count: u16,
        rop: u32,
        pixels: &[u8],
    ) -> Self {
        let (x, y, cx, cy) = dest;
        let body = Body::new()
            .rect(0, 0, 0, 0)
            .i32(x)
            .i32(y)
            .i32(0)
            .i32(0)
            .i32(src_width)
            .i32(height.abs())
            .u32(80)
            .u32(40)
            .u32(120)
            .u32(pixels.len() as u32)
            .u32(0)
            .u32(rop)
            .i32(cx)
            .i32(cy)
            .u32(40)
            .i32(src_width)
            .i32(height)
            .u16(1)
            .u16(bit_count)
            .u32(0)
            .u32(pixels.len() as u32)
            .zeros(16)
            .bytes(pixels);
        self.record(EmrType::StretchDiBits, body)
    }
}
