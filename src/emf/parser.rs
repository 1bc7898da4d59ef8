// EMF container parser
//
// Decodes the whole record stream up front into an immutable `EmfFile`:
// the header, the drawable records in file order, and the EOF marker.

use super::record_parser::read_record;
use super::records::types::{EmrType, RectL, SizeL};
use super::records::{EofRecord, Record};
use crate::common::binary::ByteCursor;
use crate::common::error::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, trace};
use zerocopy::FromBytes;

/// EMF header information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmfHeader {
    /// Bounds of the picture in device units, inclusive
    pub bounds: RectL,
    /// Frame rectangle in .01 millimeter units
    pub frame: RectL,
    /// Version
    pub version: u32,
    /// Declared size of the file in bytes
    pub size: u32,
    /// Declared number of records
    pub num_records: u32,
    /// Declared number of handle table entries
    pub num_handles: u16,
    /// Number of palette entries in the EOF record
    pub num_palette: u32,
    /// Reference device size in pixels
    pub device: SizeL,
    /// Reference device size in millimeters
    pub millimeters: SizeL,
    /// Optional application/picture description
    pub description: String,
}

/// Raw EMF header structure for zerocopy parsing (88 bytes total)
#[derive(Debug, Clone, FromBytes)]
#[repr(C)]
pub(crate) struct RawEmfHeader {
    pub record_type: u32,
    pub record_size: u32,
    pub bounds: RectL,
    pub frame: RectL,
    /// Must be 0x464D4520 ("EMF ")
    pub signature: u32,
    pub version: u32,
    pub size: u32,
    pub num_records: u32,
    pub num_handles: u16,
    pub reserved: u16,
    /// Description length in UTF-16 code units
    pub description_size: u32,
    /// Description offset from the start of the record
    pub description_offset: u32,
    pub num_palette: u32,
    pub device: SizeL,
    pub millimeters: SizeL,
}

/// EMR_EOF fixed part
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C)]
pub(crate) struct EmrEof {
    pub record_type: u32,
    pub record_size: u32,
    pub num_pal_entries: u32,
    /// Palette offset from the start of the record
    pub off_pal_entries: u32,
}

impl EmfHeader {
    /// "EMF " in little-endian
    pub const SIGNATURE: u32 = 0x464D4520;

    pub(crate) fn from_raw(raw: &RawEmfHeader, description: String) -> Self {
        Self {
            bounds: raw.bounds,
            frame: raw.frame,
            version: raw.version,
            size: raw.size,
            num_records: raw.num_records,
            num_handles: raw.num_handles,
            num_palette: raw.num_palette,
            device: raw.device,
            millimeters: raw.millimeters,
            description,
        }
    }

    /// Width of the picture in device pixels (bounds are inclusive)
    pub fn width(&self) -> i64 {
        self.bounds.right as i64 - self.bounds.left as i64 + 1
    }

    /// Height of the picture in device pixels (bounds are inclusive)
    pub fn height(&self) -> i64 {
        self.bounds.bottom as i64 - self.bounds.top as i64 + 1
    }

    /// Raster dimensions implied by the bounds
    pub fn raster_size(&self) -> Result<(u32, u32)> {
        let (width, height) = (self.width(), self.height());
        match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(Error::InvalidRasterSize { width, height }),
        }
    }
}

/// A fully decoded metafile
///
/// Immutable once parsed, so one `EmfFile` can back any number of renders.
#[derive(Debug, Clone)]
pub struct EmfFile {
    header: EmfHeader,
    /// Drawable records in file order, header and EOF excluded
    records: Vec<Record>,
    eof: EofRecord,
}

impl EmfFile {
    /// Decode a complete EMF byte stream.
    ///
    /// Any decode error aborts parsing; there is no partial result.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);

        let first_type = cursor.clone().read_u32()?;
        let header = match read_record(&mut cursor)? {
            Record::Header(header) => header,
            _ => {
                return Err(Error::MalformedRecord {
                    offset: 0,
                    record_type: first_type,
                    reason: "stream does not start with an EMF header".into(),
                });
            },
        };
        debug!(
            bounds = ?header.bounds,
            declared_records = header.num_records,
            "parsed EMF header"
        );

        let mut records = Vec::new();
        let mut live_handles = HashSet::new();
        let mut eof = None;

        while !cursor.is_exhausted() {
            let offset = cursor.absolute_position();
            let record = match read_record(&mut cursor)? {
                // Only the first header is authoritative
                Record::Header(_) => Record::Skip {
                    record_type: EmrType::Header as u32,
                    size: (cursor.absolute_position() - offset) as u32,
                },
                Record::Eof(record) => {
                    eof = Some(record);
                    break;
                },
                record => record,
            };
            trace!(offset, record = record.name(), "decoded record");

            if let Some(handle) = record.created_handle()
                && !live_handles.insert(handle)
            {
                return Err(Error::DuplicateHandle { handle, offset });
            }
            if let Record::DeleteObject(handle) = record {
                // Deleting an unknown handle is a render-time concern
                live_handles.remove(&handle);
            }
            records.push(record);
        }

        let Some(eof) = eof else {
            return Err(Error::MalformedRecord {
                offset: cursor.absolute_position(),
                record_type: EmrType::Eof as u32,
                reason: "stream ends without an EOF record".into(),
            });
        };
        debug!(records = records.len(), "decoded EMF records");

        Ok(Self {
            header,
            records,
            eof,
        })
    }

    pub fn header(&self) -> &EmfHeader {
        &self.header
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Iterate the drawable records in file order
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn eof(&self) -> &EofRecord {
        &self.eof
    }

    /// Declared logical bounds
    pub fn bounds(&self) -> RectL {
        self.header.bounds
    }

    /// Output raster size (`bounds + 1` on each axis)
    pub fn raster_size(&self) -> Result<(u32, u32)> {
        self.header.raster_size()
    }
}

impl<'a> IntoIterator for &'a EmfFile {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emf::records::types::PointL;
    use crate::emf::test_support::{Body, EmfBuilder, raw_record};

    #[test]
    fn test_emf_signature() {
        assert_eq!(EmfHeader::SIGNATURE.to_le_bytes(), *b" EMF");
    }

    #[test]
    fn test_raster_size_from_bounds() {
        let data = EmfBuilder::new(0, 0, 99, 49).finish();
        let file = EmfFile::parse(&data).unwrap();
        assert_eq!(file.raster_size().unwrap(), (100, 50));
        assert!(file.records().is_empty());
        assert!(file.eof().palette.is_empty());
    }

    #[test]
    fn test_empty_bounds_rejected() {
        let data = EmfBuilder::new(10, 10, 5, 20).finish();
        let file = EmfFile::parse(&data).unwrap();
        assert!(matches!(
            file.raster_size(),
            Err(Error::InvalidRasterSize { width: -4, .. })
        ));
    }

    #[test]
    fn test_header_description() {
        let data = EmfBuilder::new(0, 0, 9, 9)
            .description("Chart\0Sheet1\0\0")
            .finish();
        let file = EmfFile::parse(&data).unwrap();
        assert_eq!(file.header().description, "Chart\0Sheet1");
    }

    #[test]
    fn test_bad_signature() {
        let mut data = EmfBuilder::new(0, 0, 9, 9).finish();
        data[40] = b'X';
        assert!(matches!(
            EmfFile::parse(&data),
            Err(Error::MalformedRecord { record_type: 1, .. })
        ));
    }

    #[test]
    fn test_missing_header() {
        let mut data = raw_record(EmrType::SaveDc as u32, &[]);
        data.extend(raw_record(EmrType::Eof as u32, &Body::new().u32(0).u32(0).u32(20).finish()));
        match EmfFile::parse(&data) {
            Err(Error::MalformedRecord {
                record_type, reason, ..
            }) => {
                assert_eq!(record_type, EmrType::SaveDc as u32);
                assert!(reason.contains("header"));
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_eof() {
        let data = EmfBuilder::new(0, 0, 9, 9).line_to(1, 1).finish_without_eof();
        assert!(matches!(
            EmfFile::parse(&data),
            Err(Error::MalformedRecord { record_type: 14, .. })
        ));
    }

    #[test]
    fn test_records_after_eof_ignored() {
        let mut data = EmfBuilder::new(0, 0, 9, 9).line_to(1, 1).finish();
        data.extend(raw_record(EmrType::LineTo as u32, &Body::new().i32(2).i32(2).finish()));
        let file = EmfFile::parse(&data).unwrap();
        assert_eq!(file.records(), &[Record::LineTo(PointL::new(1, 1))]);
    }

    #[test]
    fn test_second_header_is_skipped() {
        let second = EmfBuilder::new(0, 0, 1, 1).header_bytes();
        let data = EmfBuilder::new(0, 0, 9, 9).raw(second.clone()).finish();
        let file = EmfFile::parse(&data).unwrap();
        assert_eq!(
            file.records(),
            &[Record::Skip {
                record_type: 1,
                size: second.len() as u32
            }]
        );
        assert_eq!(file.bounds(), RectL::new(0, 0, 9, 9));
    }

    #[test]
    fn test_truncated_stream() {
        let data = EmfBuilder::new(0, 0, 9, 9).line_to(3, 3).finish();
        // Cut inside the LINETO record
        let cut = data.len() - 20 - 4;
        assert!(matches!(
            EmfFile::parse(&data[..cut]),
            Err(Error::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn test_duplicate_live_handle() {
        let data = EmfBuilder::new(0, 0, 9, 9)
            .create_pen(1, 0, 1, 0)
            .create_brush(1, 0, 0x00FF00)
            .finish();
        match EmfFile::parse(&data) {
            Err(Error::DuplicateHandle { handle, offset }) => {
                assert_eq!(handle, 1);
                assert_eq!(offset, EmfBuilder::HEADER_SIZE + 28);
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_handle_reuse_after_delete() {
        let data = EmfBuilder::new(0, 0, 9, 9)
            .create_pen(1, 0, 1, 0)
            .delete_object(1)
            .create_brush(1, 0, 0x00FF00)
            .finish();
        assert_eq!(EmfFile::parse(&data).unwrap().records().len(), 3);
    }

    #[test]
    fn test_stock_range_handle_rejected() {
        let data = EmfBuilder::new(0, 0, 9, 9)
            .create_pen(0x80000001, 0, 1, 0)
            .delete_object(0x80000001)
            .create_brush(0x80000001, 0, 0x00FF00)
            .set_pixel(1, 1, 0)
            .finish();
        match EmfFile::parse(&data) {
            Err(Error::MalformedRecord {
                record_type, offset, ..
            }) => {
                assert_eq!(record_type, EmrType::CreatePen as u32);
                assert_eq!(offset, EmfBuilder::HEADER_SIZE);
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_dangling_select_decodes() {
        let data = EmfBuilder::new(0, 0, 9, 9)
            .select_object(42)
            .delete_object(43)
            .finish();
        let file = EmfFile::parse(&data).unwrap();
        assert_eq!(
            file.records(),
            &[Record::SelectObject(42), Record::DeleteObject(43)]
        );
    }

    #[test]
    fn test_file_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EmfFile>();
    }
}
