/// EMF record decoding
///
/// [`read_record`] decodes one record from a cursor positioned at its first
/// byte. Fixed fields are read from the start of the record; variable
/// sections (strings, advance arrays, bitmaps, style entries) are found by
/// seeking to `record start + offset field`. Whatever a decoder reads, the
/// outer cursor always ends up exactly `record size` bytes past the start.
use super::parser::{EmfHeader, EmrEof, RawEmfHeader};
use super::records::bitmap::{
    BITMAPINFOHEADER_SIZE, BitBlt, BitmapInfoHeader, Dib, EmrBitBltHeader, EmrStretchBltHeader,
    EmrStretchDiBitsHeader,
};
use super::records::drawing::{EmrPolyHeader, EmrPolyPolyHeader, EmrSetPixelV, Poly, PolyPoly};
use super::records::objects::{
    EmrCreateBrushIndirect, EmrCreateDibPatternBrushPtHeader, EmrCreatePaletteHeader, EmrCreatePen,
    EmrExtCreateFontIndirectWHeader, EmrExtCreatePenHeader, ExtLogPen, LogBrush, LogFont,
    LogPalette, LogPen, PaletteEntry, pen_style,
};
use super::records::state::{
    EmrExtSelectClipRgnHeader, EmrModifyWorldTransform, EmrPoint, EmrRect, EmrSetWorldTransform,
    EmrSize, EmrValue, RegionData, RegionDataHeader,
};
use super::records::text::{EmrExtTextOutHeader, EmrText, EmrTextInfo, ExtTextOut, TextOptions};
use super::records::types::{
    EmrHeader, EmrType, PointL, PointS, RECORD_HEADER_SIZE, RectL, stock_objects,
};
use super::records::{EofRecord, Record};
use crate::common::binary::ByteCursor;
use crate::common::error::{Error, Result};
use zerocopy::FromBytes;

/// Decode the record starting at the cursor's position.
///
/// On success the cursor sits exactly `record size` bytes further on. A
/// record that does not fit in the remaining buffer fails with
/// [`Error::UnexpectedEnd`]; inconsistent fields fail with
/// [`Error::MalformedRecord`].
pub fn read_record(cursor: &mut ByteCursor<'_>) -> Result<Record> {
    let start = cursor.position();
    let header: EmrHeader = cursor.read_struct()?;
    let size = header.record_size as usize;
    if size < RECORD_HEADER_SIZE {
        return Err(Error::MalformedRecord {
            offset: cursor.absolute_position() - RECORD_HEADER_SIZE,
            record_type: header.record_type,
            reason: format!("declared size {size} is smaller than the record header"),
        });
    }

    let window = cursor.sub_cursor(start, size)?;
    let record = RecordReader::new(window, header.record_type).decode()?;
    cursor.seek_to(start + size)?;
    Ok(record)
}

/// Reader confined to a single record's bytes.
///
/// Reads that would cross the record's declared size are reported as
/// [`Error::MalformedRecord`], since the buffer itself is large enough.
pub struct RecordReader<'a> {
    cursor: ByteCursor<'a>,
    record_type: u32,
}

impl<'a> RecordReader<'a> {
    /// Wrap a cursor spanning exactly one record, header included.
    pub fn new(cursor: ByteCursor<'a>, record_type: u32) -> Self {
        Self {
            cursor,
            record_type,
        }
    }

    #[inline]
    fn size(&self) -> usize {
        self.cursor.len()
    }

    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedRecord {
            offset: self.cursor.absolute_position() - self.cursor.position(),
            record_type: self.record_type,
            reason: reason.into(),
        }
    }

    /// Read the record's fixed part, header included.
    fn fixed<T: FromBytes>(&mut self) -> Result<T> {
        let needed = std::mem::size_of::<T>();
        if self.size() < needed {
            return Err(self.malformed(format!(
                "record is {} bytes but its fixed fields need {needed}",
                self.size()
            )));
        }
        self.cursor.seek_to(0)?;
        self.cursor.read_struct()
    }

    /// Read `count` elements at the current position.
    fn array<T: FromBytes>(&mut self, count: u32) -> Result<Vec<T>> {
        let element = std::mem::size_of::<T>();
        match (count as usize).checked_mul(element) {
            Some(total) if total <= self.cursor.remaining() => {
                self.cursor.read_array(count as usize)
            },
            _ => Err(self.malformed(format!(
                "{count} elements of {element} bytes run past the end of the record"
            ))),
        }
    }

    /// Move to a section addressed relative to the record start.
    fn seek_section(&mut self, offset: u32) -> Result<()> {
        let offset = offset as usize;
        if offset < RECORD_HEADER_SIZE || offset > self.size() {
            return Err(self.malformed(format!(
                "section offset {offset} lies outside the {}-byte record",
                self.size()
            )));
        }
        self.cursor.seek_to(offset)
    }

    fn array_at<T: FromBytes>(&mut self, offset: u32, count: u32) -> Result<Vec<T>> {
        self.seek_section(offset)?;
        self.array(count)
    }

    fn bytes_at(&mut self, offset: u32, len: u32) -> Result<&'a [u8]> {
        self.seek_section(offset)?;
        if len as usize > self.cursor.remaining() {
            return Err(self.malformed(format!(
                "{len}-byte section at offset {offset} runs past the end of the record"
            )));
        }
        self.cursor.read_bytes(len as usize)
    }

    /// Lift an embedded DIB; `None` when the record carries no bitmap.
    fn dib(&mut self, off_bmi: u32, cb_bmi: u32, off_bits: u32, cb_bits: u32) -> Result<Option<Dib>> {
        if cb_bmi == 0 {
            return Ok(None);
        }
        if (cb_bmi as usize) < BITMAPINFOHEADER_SIZE {
            return Err(self.malformed(format!("bitmap info of {cb_bmi} bytes is too short")));
        }
        let bmi = self.bytes_at(off_bmi, cb_bmi)?;
        let (header, _) = BitmapInfoHeader::read_from_prefix(bmi)
            .map_err(|_| self.malformed("unreadable bitmap info header"))?;
        let header_len = (header.size as usize).clamp(BITMAPINFOHEADER_SIZE, bmi.len());
        let color_table = bmi[header_len..].to_vec();
        let bits = if cb_bits == 0 {
            Vec::new()
        } else {
            self.bytes_at(off_bits, cb_bits)?.to_vec()
        };
        Ok(Some(Dib {
            header,
            color_table,
            bits,
        }))
    }

    fn handle(&self, handle: u32) -> Result<u32> {
        if handle == 0 {
            return Err(self.malformed("object handle 0 is reserved"));
        }
        if stock_objects::is_stock_object(handle) {
            return Err(self.malformed(format!(
                "object handle 0x{handle:08X} is in the stock object range"
            )));
        }
        Ok(handle)
    }

    fn value(&mut self) -> Result<u32> {
        Ok(self.fixed::<EmrValue>()?.value)
    }

    fn point(&mut self) -> Result<PointL> {
        Ok(self.fixed::<EmrPoint>()?.point)
    }

    fn rect(&mut self) -> Result<RectL> {
        Ok(self.fixed::<EmrRect>()?.rect)
    }

    /// Decode the record body according to its type tag.
    pub fn decode(&mut self) -> Result<Record> {
        let Some(kind) = EmrType::from_u32(self.record_type) else {
            return Ok(Record::Skip {
                record_type: self.record_type,
                size: self.size() as u32,
            });
        };

        let record = match kind {
            EmrType::Header => Record::Header(self.header()?),
            EmrType::Eof => Record::Eof(self.eof()?),

            EmrType::SetMapMode => Record::SetMapMode(self.value()?),
            EmrType::SetWindowExtEx => Record::SetWindowExtEx(self.fixed::<EmrSize>()?.size),
            EmrType::SetWindowOrgEx => Record::SetWindowOrgEx(self.point()?),
            EmrType::SetViewportExtEx => Record::SetViewportExtEx(self.fixed::<EmrSize>()?.size),
            EmrType::SetViewportOrgEx => Record::SetViewportOrgEx(self.point()?),
            EmrType::SetWorldTransform => {
                Record::SetWorldTransform(self.fixed::<EmrSetWorldTransform>()?.xform)
            },
            EmrType::ModifyWorldTransform => {
                let raw: EmrModifyWorldTransform = self.fixed()?;
                Record::ModifyWorldTransform {
                    xform: raw.xform,
                    mode: raw.mode,
                }
            },

            EmrType::SetBkMode => Record::SetBkMode(self.value()?),
            EmrType::SetPolyFillMode => Record::SetPolyFillMode(self.value()?),
            EmrType::SetTextAlign => Record::SetTextAlign(self.value()?),
            EmrType::SetTextColor => Record::SetTextColor(self.fixed::<EmrSetColor>()?.color),
            EmrType::SetBkColor => Record::SetBkColor(self.fixed::<EmrSetColor>()?.color),
            EmrType::SaveDc => Record::SaveDc,
            EmrType::RestoreDc => Record::RestoreDc(self.value()? as i32),
            EmrType::MoveToEx => Record::MoveToEx(self.point()?),

            EmrType::ExcludeClipRect => Record::ExcludeClipRect(self.rect()?),
            EmrType::IntersectClipRect => Record::IntersectClipRect(self.rect()?),
            EmrType::ExtSelectClipRgn => self.ext_select_clip_rgn()?,

            EmrType::CreatePen => {
                let raw: EmrCreatePen = self.fixed()?;
                Record::CreatePen {
                    handle: self.handle(raw.object_index)?,
                    pen: LogPen {
                        style: raw.pen_style,
                        width: raw.width,
                        color: raw.color,
                    },
                }
            },
            EmrType::ExtCreatePen => self.ext_create_pen()?,
            EmrType::CreateBrushIndirect => {
                let raw: EmrCreateBrushIndirect = self.fixed()?;
                Record::CreateBrushIndirect {
                    handle: self.handle(raw.object_index)?,
                    brush: LogBrush {
                        style: raw.brush_style,
                        color: raw.color,
                        hatch: raw.brush_hatch,
                    },
                }
            },
            EmrType::CreateDibPatternBrushPt => {
                let raw: EmrCreateDibPatternBrushPtHeader = self.fixed()?;
                let handle = self.handle(raw.object_index)?;
                let dib = self
                    .dib(raw.off_bmi, raw.cb_bmi, raw.off_bits, raw.cb_bits)?
                    .ok_or_else(|| self.malformed("pattern brush without a bitmap"))?;
                Record::CreateDibPatternBrushPt {
                    handle,
                    usage: raw.usage,
                    dib,
                }
            },
            EmrType::ExtCreateFontIndirectW => {
                let raw: EmrExtCreateFontIndirectWHeader = self.fixed()?;
                Record::ExtCreateFontIndirectW {
                    handle: self.handle(raw.object_index)?,
                    font: LogFont::from(&raw.log_font),
                }
            },
            EmrType::CreatePalette => {
                let raw: EmrCreatePaletteHeader = self.fixed()?;
                let handle = self.handle(raw.object_index)?;
                let entries: Vec<PaletteEntry> = self.array(raw.num_entries as u32)?;
                Record::CreatePalette {
                    handle,
                    palette: LogPalette { entries },
                }
            },
            EmrType::SelectObject => Record::SelectObject(self.value()?),
            EmrType::SelectPalette => Record::SelectPalette(self.value()?),
            EmrType::DeleteObject => Record::DeleteObject(self.value()?),

            EmrType::SetPixelV => {
                let raw: EmrSetPixelV = self.fixed()?;
                Record::SetPixelV {
                    point: raw.point,
                    color: raw.color,
                }
            },
            EmrType::LineTo => Record::LineTo(self.point()?),
            EmrType::Rectangle => Record::Rectangle(self.rect()?),
            EmrType::Ellipse => Record::Ellipse(self.rect()?),

            EmrType::PolyBezier => Record::PolyBezier(self.bezier(true, false)?),
            EmrType::PolyBezier16 => Record::PolyBezier(self.bezier(false, false)?),
            EmrType::PolyBezierTo => Record::PolyBezierTo(self.bezier(true, true)?),
            EmrType::PolyBezierTo16 => Record::PolyBezierTo(self.bezier(false, true)?),
            EmrType::Polygon => Record::Polygon(self.poly(true)?),
            EmrType::Polygon16 => Record::Polygon(self.poly(false)?),
            EmrType::Polyline => Record::Polyline(self.poly(true)?),
            EmrType::Polyline16 => Record::Polyline(self.poly(false)?),
            EmrType::PolyLineTo => Record::PolylineTo(self.poly(true)?),
            EmrType::PolyLineTo16 => Record::PolylineTo(self.poly(false)?),
            EmrType::PolyPolyline => Record::PolyPolyline(self.poly_poly(true)?),
            EmrType::PolyPolyline16 => Record::PolyPolyline(self.poly_poly(false)?),
            EmrType::PolyPolygon => Record::PolyPolygon(self.poly_poly(true)?),
            EmrType::PolyPolygon16 => Record::PolyPolygon(self.poly_poly(false)?),

            EmrType::BitBlt => Record::BitBlt(self.bit_blt()?),
            EmrType::StretchBlt => Record::StretchBlt(self.stretch_blt()?),
            EmrType::StretchDiBits => Record::StretchDiBits(self.stretch_dibits()?),

            EmrType::ExtTextOutA => Record::ExtTextOutA(self.ext_text_out(false)?),
            EmrType::ExtTextOutW => Record::ExtTextOutW(self.ext_text_out(true)?),
        };
        Ok(record)
    }

    fn header(&mut self) -> Result<EmfHeader> {
        let raw: RawEmfHeader = self.fixed()?;
        if raw.signature != EmfHeader::SIGNATURE {
            return Err(self.malformed(format!(
                "invalid EMF signature 0x{:08X}",
                raw.signature
            )));
        }

        let description = if raw.description_size > 0 && raw.description_offset != 0 {
            let units: Vec<u16> = self.array_at(raw.description_offset, raw.description_size)?;
            let end = units
                .iter()
                .rposition(|&c| c != 0)
                .map_or(0, |last| last + 1);
            String::from_utf16_lossy(&units[..end])
        } else {
            String::new()
        };

        Ok(EmfHeader::from_raw(&raw, description))
    }

    fn eof(&mut self) -> Result<EofRecord> {
        let raw: EmrEof = self.fixed()?;
        let palette = if raw.num_pal_entries > 0 {
            self.array_at(raw.off_pal_entries, raw.num_pal_entries)?
        } else {
            Vec::new()
        };
        Ok(EofRecord { palette })
    }

    fn ext_select_clip_rgn(&mut self) -> Result<Record> {
        let raw: EmrExtSelectClipRgnHeader = self.fixed()?;
        if raw.rgn_data_size == 0 {
            return Ok(Record::ExtSelectClipRgn {
                mode: raw.region_mode,
                region: None,
            });
        }
        if (raw.rgn_data_size as usize) < std::mem::size_of::<RegionDataHeader>() {
            return Err(self.malformed(format!(
                "region data of {} bytes is shorter than its header",
                raw.rgn_data_size
            )));
        }
        let region_header: RegionDataHeader = self.read_here()?;
        let rects: Vec<RectL> = self.array(region_header.count_rects)?;
        Ok(Record::ExtSelectClipRgn {
            mode: raw.region_mode,
            region: Some(RegionData {
                bounds: region_header.bounds,
                rects,
            }),
        })
    }

    /// Read a structure at the current position, within the record.
    fn read_here<T: FromBytes>(&mut self) -> Result<T> {
        let mut items = self.array::<T>(1)?;
        items
            .pop()
            .ok_or_else(|| self.malformed("empty structure read"))
    }

    fn ext_create_pen(&mut self) -> Result<Record> {
        let raw: EmrExtCreatePenHeader = self.fixed()?;
        let handle = self.handle(raw.object_index)?;
        // Style entries follow the fixed part and only exist for user styles
        let style_entries = if raw.pen_style & pen_style::STYLE_MASK == pen_style::USERSTYLE {
            self.array(raw.num_style_entries)?
        } else {
            Vec::new()
        };
        Ok(Record::ExtCreatePen {
            handle,
            pen: ExtLogPen {
                style: raw.pen_style,
                width: raw.width,
                brush_style: raw.brush_style,
                color: raw.color,
                hatch: raw.brush_hatch,
                style_entries,
            },
        })
    }

    fn points(&mut self, count: u32, wide: bool) -> Result<Vec<PointL>> {
        if wide {
            self.array(count)
        } else {
            Ok(self
                .array::<PointS>(count)?
                .into_iter()
                .map(PointL::from)
                .collect())
        }
    }

    fn poly(&mut self, wide: bool) -> Result<Poly> {
        let raw: EmrPolyHeader = self.fixed()?;
        let points = self.points(raw.count, wide)?;
        Ok(Poly {
            bounds: raw.bounds,
            points,
        })
    }

    fn bezier(&mut self, wide: bool, continues: bool) -> Result<Poly> {
        let poly = self.poly(wide)?;
        let count = poly.points.len();
        // A standalone curve carries its start point; a continuation starts at
        // the current position
        let valid = if continues {
            count % 3 == 0
        } else {
            count == 0 || count % 3 == 1
        };
        if !valid {
            return Err(self.malformed(format!("{count} points do not form cubic segments")));
        }
        Ok(poly)
    }

    fn poly_poly(&mut self, wide: bool) -> Result<PolyPoly> {
        let raw: EmrPolyPolyHeader = self.fixed()?;
        let counts: Vec<u32> = self.array(raw.num_polys)?;
        let total: u64 = counts.iter().map(|&c| c as u64).sum();
        if total != raw.count as u64 {
            return Err(self.malformed(format!(
                "figure sizes add up to {total} points, record declares {}",
                raw.count
            )));
        }
        let points = self.points(raw.count, wide)?;
        Ok(PolyPoly {
            bounds: raw.bounds,
            counts,
            points,
        })
    }

    fn bit_blt(&mut self) -> Result<BitBlt> {
        let raw: EmrBitBltHeader = self.fixed()?;
        self.blt_from(&raw, raw.cx_dest, raw.cy_dest)
    }

    fn stretch_blt(&mut self) -> Result<BitBlt> {
        let raw: EmrStretchBltHeader = self.fixed()?;
        self.blt_from(&raw.blt, raw.cx_src, raw.cy_src)
    }

    fn blt_from(&mut self, raw: &EmrBitBltHeader, cx_src: i32, cy_src: i32) -> Result<BitBlt> {
        let source = self.dib(
            raw.off_bmi_src,
            raw.cb_bmi_src,
            raw.off_bits_src,
            raw.cb_bits_src,
        )?;
        Ok(BitBlt {
            bounds: raw.bounds,
            x_dest: raw.x_dest,
            y_dest: raw.y_dest,
            cx_dest: raw.cx_dest,
            cy_dest: raw.cy_dest,
            x_src: raw.x_src,
            y_src: raw.y_src,
            cx_src,
            cy_src,
            rop: raw.rop,
            xform_src: raw.xform_src,
            bk_color_src: raw.bk_color_src,
            usage_src: raw.usage_src,
            source,
        })
    }

    fn stretch_dibits(&mut self) -> Result<BitBlt> {
        let raw: EmrStretchDiBitsHeader = self.fixed()?;
        let source = self.dib(
            raw.off_bmi_src,
            raw.cb_bmi_src,
            raw.off_bits_src,
            raw.cb_bits_src,
        )?;
        Ok(BitBlt {
            bounds: raw.bounds,
            x_dest: raw.x_dest,
            y_dest: raw.y_dest,
            cx_dest: raw.cx_dest,
            cy_dest: raw.cy_dest,
            x_src: raw.x_src,
            y_src: raw.y_src,
            cx_src: raw.cx_src,
            cy_src: raw.cy_src,
            rop: raw.rop,
            xform_src: Default::default(),
            bk_color_src: Default::default(),
            usage_src: raw.usage_src,
            source,
        })
    }

    fn ext_text_out(&mut self, wide: bool) -> Result<ExtTextOut> {
        let raw: EmrExtTextOutHeader = self.fixed()?;
        let text = self.emr_text(&raw.text, wide)?;
        Ok(ExtTextOut {
            bounds: raw.bounds,
            graphics_mode: raw.graphics_mode,
            ex_scale: raw.ex_scale,
            ey_scale: raw.ey_scale,
            text,
        })
    }

    fn emr_text(&mut self, info: &EmrTextInfo, wide: bool) -> Result<EmrText> {
        let options = TextOptions::from_bits_retain(info.options);
        let count = info.num_chars;
        let mut text = EmrText {
            reference: info.reference,
            options,
            rectangle: info.rectangle,
            code_units: Vec::new(),
            dx: Vec::new(),
            dy: Vec::new(),
        };
        if count == 0 {
            return Ok(text);
        }
        if info.off_dx == 0 {
            return Err(self.malformed(format!(
                "{count} characters without an advance array"
            )));
        }

        text.code_units = if wide {
            self.array_at(info.off_string, count)?
        } else {
            let bytes = self.bytes_at(info.off_string, count)?;
            let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            decoded.encode_utf16().collect()
        };

        if options.contains(TextOptions::PDY) {
            let pairs = count
                .checked_mul(2)
                .ok_or_else(|| self.malformed("advance array size overflows"))?;
            let values: Vec<i32> = self.array_at(info.off_dx, pairs)?;
            text.dx = values.iter().step_by(2).copied().collect();
            text.dy = values.iter().skip(1).step_by(2).copied().collect();
        } else {
            text.dx = self.array_at(info.off_dx, count)?;
        }
        Ok(text)
    }
}

/// EMR_SETTEXTCOLOR, EMR_SETBKCOLOR
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
struct EmrSetColor {
    record_type: u32,
    record_size: u32,
    color: super::records::types::ColorRef,
}
