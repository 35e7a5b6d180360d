//! Error types for jpeg-tag-io

use std::io;

/// Result type for jpeg-tag-io operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or saving JPEG metadata
///
/// Every variant is fatal for the pass that produced it. Segments that merely
/// turn out not to be metadata are reported through
/// [`SegmentClass`](crate::SegmentClass), never through this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Invalid segment
    #[error("Invalid segment at offset {offset}: {reason}")]
    InvalidSegment { offset: u64, reason: String },

    /// Exif identifier matched but the TIFF header carries the wrong magic
    #[error("Invalid Exif TIFF magic 0x{magic:04X} at offset {offset}")]
    InvalidExifMagic { offset: u64, magic: u16 },

    /// A rendered segment does not fit the 16-bit size field
    #[error("{label} segment too large: {size} bytes (max: {max})")]
    SegmentTooLarge {
        label: &'static str,
        size: usize,
        max: usize,
    },

    /// XML parser error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XMP packet could not be interpreted
    #[error("Invalid XMP: {0}")]
    InvalidXmp(String),

    /// Exif tag tree could not be interpreted
    #[error("Invalid Exif: {0}")]
    InvalidExif(String),
}
