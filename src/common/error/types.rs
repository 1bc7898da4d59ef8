//! Unified error types for the metafile decoder and renderer.
//!
//! Errors fall into two severities. Structural errors are raised while
//! decoding and abort the whole file, since later record boundaries can no
//! longer be trusted. Drawing errors are raised while a record is applied to
//! the device context; the renderer logs them and moves on to the next record.
use thiserror::Error;

/// Main error type for metafile operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A read asked for more bytes than the buffer holds
    #[error("Unexpected end of data at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A seek would leave the buffer
    #[error("Invalid offset: seeking {delta} bytes from offset {from} leaves a buffer of {len} bytes")]
    InvalidOffset { from: usize, delta: i64, len: usize },

    /// A record's size, counts or internal offsets are inconsistent
    #[error("Malformed record 0x{record_type:02X} at offset {offset}: {reason}")]
    MalformedRecord {
        offset: usize,
        record_type: u32,
        reason: String,
    },

    /// The stream created an object under a handle that is still live
    #[error("Duplicate object handle {handle} at offset {offset}")]
    DuplicateHandle { handle: u32, offset: usize },

    /// A record referenced a handle that was never created or already deleted
    #[error("Unknown object handle {0}")]
    UnknownHandle(u32),

    /// Pixel data uses an encoding the converter does not implement
    #[error("Unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    /// Bitmap header and pixel data disagree
    #[error("Invalid bitmap: {0}")]
    InvalidBitmap(String),

    /// The header bounds describe an empty or oversized raster
    #[error("Invalid raster size {width}x{height}")]
    InvalidRasterSize { width: i64, height: i64 },

    /// A drawing primitive could not be realized on the raster
    #[error("Drawing failed: {0}")]
    Drawing(String),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error aborts decoding rather than a single record's drawing.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedEnd { .. }
                | Error::InvalidOffset { .. }
                | Error::MalformedRecord { .. }
                | Error::DuplicateHandle { .. }
                | Error::InvalidRasterSize { .. }
                | Error::Image(_)
                | Error::Io(_)
        )
    }
}

/// Result type for metafile operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        assert!(Error::UnexpectedEnd { offset: 0, needed: 4, available: 2 }.is_fatal());
        assert!(Error::DuplicateHandle { handle: 1, offset: 8 }.is_fatal());
        assert!(!Error::UnknownHandle(3).is_fatal());
        assert!(!Error::UnsupportedPixelFormat("8 bpp".into()).is_fatal());
    }

    #[test]
    fn test_malformed_display() {
        let err = Error::MalformedRecord {
            offset: 96,
            record_type: 0x54,
            reason: "string section out of range".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed record 0x54 at offset 96: string section out of range"
        );
    }
}
