//! Segment scanning primitives
//!
//! A JPEG stream is a sequence of `FF mm` markers. All markers the scanner
//! visits (apart from SOI, EOI and SOS) are followed by a big-endian size
//! field that counts itself but not the marker.

use crate::error::{Error, Result};
use crate::store::ByteStore;
use std::io::Read;

/// First byte of every marker
pub const MARKER_PREFIX: u8 = 0xFF;

// JPEG markers
pub const SOI: u8 = 0xD8; // Start of Image
pub const EOI: u8 = 0xD9; // End of Image
pub const SOS: u8 = 0xDA; // Start of Scan (entropy-coded data follows)
pub const DQT: u8 = 0xDB; // Quantization tables
pub const APP0: u8 = 0xE0; // JFIF
pub const APP1: u8 = 0xE1; // Exif / XMP
pub const COM: u8 = 0xFE; // Comment

/// Largest value a segment size field can hold
pub const MAX_SEGMENT_SIZE: usize = u16::MAX as usize;

/// Returns true for the start-of-frame markers that carry image dimensions
///
/// C4 (DHT), C8 (JPG) and CC (DAC) share the range but are not frames.
pub fn is_sof(marker: u8) -> bool {
    matches!(
        marker,
        0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF
    )
}

/// Get human-readable label for a JPEG marker
pub fn marker_label(marker: u8) -> &'static str {
    match marker {
        SOI => "SOI",
        EOI => "EOI",
        SOS => "SOS",
        DQT => "DQT",
        0xC0 => "SOF0",
        0xC1 => "SOF1",
        0xC2 => "SOF2",
        0xC3 => "SOF3",
        0xC4 => "DHT",
        0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => "SOF",
        0xDD => "DRI",
        COM => "COM",
        APP0 => "APP0",
        APP1 => "APP1",
        0xE2..=0xEF => "APPn",
        _ => "OTHER",
    }
}

/// A byte range in a file (offset and size)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset from start of file
    pub offset: u64,
    /// Size in bytes
    pub size: u64,
}

impl ByteRange {
    /// Create a new byte range
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Get the end offset of this range
    pub fn end_offset(&self) -> u64 {
        self.offset + self.size
    }
}

/// A marker segment found during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Marker code (the byte after 0xFF)
    pub marker: u8,
    /// Offset of the 0xFF prefix byte
    pub offset: u64,
    /// Value of the size field, which includes its own two bytes
    pub size: u16,
}

impl Segment {
    /// Offset right after the marker, where the size field starts
    pub fn position(&self) -> u64 {
        self.offset + 2
    }

    /// Payload length, excluding the size field
    pub fn payload_len(&self) -> usize {
        self.size as usize - 2
    }

    /// Where the payload lives in the file
    pub fn payload(&self) -> ByteRange {
        ByteRange::new(self.position() + 2, self.payload_len() as u64)
    }

    /// Marker, size field and payload
    pub fn total_len(&self) -> u64 {
        2 + self.size as u64
    }
}

/// Outcome of handing a segment to the metadata handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentClass {
    /// Holds metadata that a save re-renders
    Metadata,
    /// Structural or unknown; must be left where it is
    Other,
}

impl SegmentClass {
    pub fn is_metadata(self) -> bool {
        self == SegmentClass::Metadata
    }
}

fn read_pair<R: Read>(source: &mut R, offset: u64, what: &str) -> Result<[u8; 2]> {
    let mut buf = [0u8; 2];
    source.read_exact(&mut buf).map_err(|_| Error::InvalidSegment {
        offset,
        reason: format!("truncated {}", what),
    })?;
    Ok(buf)
}

/// Check that the stream opens with the start-of-image marker
pub fn validate_header<S: ByteStore>(source: &mut S) -> Result<()> {
    let mut magic = [0u8; 2];
    if source.read_exact(&mut magic).is_err() || magic != [MARKER_PREFIX, SOI] {
        return Err(Error::InvalidFormat("Not a JPEG file".into()));
    }
    Ok(())
}

/// Read the two marker bytes at the cursor and return the marker code
pub fn read_segment_marker<S: ByteStore>(source: &mut S) -> Result<u8> {
    let offset = source.stream_position()?;
    let [prefix, marker] = read_pair(source, offset, "segment marker")?;
    if prefix != MARKER_PREFIX {
        return Err(Error::InvalidSegment {
            offset,
            reason: format!("Expected 0xFF, got 0x{:02X}", prefix),
        });
    }
    Ok(marker)
}

/// Read a segment size field whose first byte is at `position`
///
/// The cursor must already be at `position`. The size must cover at least
/// its own two bytes and the segment must end within `file_len`.
pub fn read_segment_size<S: ByteStore>(source: &mut S, position: u64, file_len: u64) -> Result<u16> {
    let bytes = read_pair(source, position, "segment size")?;
    let size = u16::from_be_bytes(bytes);
    if size < 2 {
        return Err(Error::InvalidSegment {
            offset: position,
            reason: format!("segment size {} is smaller than the size field", size),
        });
    }
    if position + size as u64 > file_len {
        return Err(Error::InvalidSegment {
            offset: position,
            reason: format!(
                "segment of {} bytes runs past end of file ({} bytes)",
                size, file_len
            ),
        });
    }
    Ok(size)
}
