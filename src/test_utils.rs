//! Test utilities for building JPEG fixtures in memory.
//!
//! Every fixture the crate's tests use is assembled with [`JpegBuilder`], so
//! no binary files need to be committed. The streams are structurally valid
//! (correct markers and size fields) but the entropy-coded data is filler.
//!
//! # Usage
//!
//! ```
//! use jpeg_tag_io::test_utils::JpegBuilder;
//! use jpeg_tag_io::JpegFile;
//!
//! # fn example() -> jpeg_tag_io::Result<()> {
//! let bytes = JpegBuilder::new()
//!     .jfif()
//!     .comment("hello")
//!     .luminance_dqt()
//!     .sof(640, 480)
//!     .scan()
//!     .build();
//!
//! let file = JpegFile::from_bytes(bytes)?;
//! assert_eq!(file.tags().comment().unwrap().value, "hello");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::{
    formats::DEFAULT_JFIF_HEADER,
    quality::{STANDARD_CHROMINANCE, STANDARD_LUMINANCE},
    segment::{APP1, COM, DQT, EOI, MARKER_PREFIX, SOI, SOS},
    tiff::{self, Ifd, TIFF_HEADER_LEN},
};

/// Scan data placed after SOS; contains a stuffed `FF 00` like real data
const FILLER_SCAN: [u8; 8] = [0x12, 0x34, 0xFF, 0x00, 0x56, 0x78, 0x9A, 0xBC];

/// Builder for synthetic JPEG byte streams
#[derive(Debug, Clone)]
pub struct JpegBuilder {
    bytes: Vec<u8>,
}

impl Default for JpegBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegBuilder {
    /// Start a stream with SOI
    pub fn new() -> Self {
        Self {
            bytes: vec![MARKER_PREFIX, SOI],
        }
    }

    /// Current length of the stream, i.e. the offset the next segment lands at
    pub fn offset(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Append raw bytes with no framing
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Append a segment with a correct size field
    ///
    /// # Panics
    ///
    /// Panics if the payload does not fit a segment.
    pub fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        let size = u16::try_from(payload.len() + 2).expect("payload too large for a segment");
        self.bytes.extend_from_slice(&[MARKER_PREFIX, marker]);
        self.bytes.extend_from_slice(&size.to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Append the default JFIF APP0 header
    pub fn jfif(self) -> Self {
        self.raw(&DEFAULT_JFIF_HEADER)
    }

    /// Append an Exif APP1 segment from a TIFF header and body
    ///
    /// `tiff` starts with the byte order mark. The header is not checked, so
    /// this can build corrupt Exif.
    pub fn exif_raw(self, tiff: &[u8]) -> Self {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(tiff);
        self.segment(APP1, &payload)
    }

    /// Append a big-endian Exif APP1 segment holding `ifd`
    pub fn exif(self, ifd: &Ifd) -> Self {
        let body =
            tiff::encode(std::slice::from_ref(ifd), TIFF_HEADER_LEN).expect("encodable IFD");
        let mut tiff = vec![b'M', b'M', 0, 42];
        tiff.extend_from_slice(&TIFF_HEADER_LEN.to_be_bytes());
        tiff.extend_from_slice(&body);
        self.exif_raw(&tiff)
    }

    /// Append an XMP APP1 segment
    pub fn xmp(self, packet: &str) -> Self {
        let mut payload = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
        payload.extend_from_slice(packet.as_bytes());
        self.segment(APP1, &payload)
    }

    /// Append a NUL-terminated COM segment
    pub fn comment(self, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        self.segment(COM, &payload)
    }

    /// Append an 8-bit DQT segment with one table
    pub fn dqt(self, id: u8, table: &[u16; 64]) -> Self {
        let mut payload = vec![id & 0x0F];
        payload.extend(table.iter().map(|&v| v.min(255) as u8));
        self.segment(DQT, &payload)
    }

    /// Standard luminance table as table 0
    pub fn luminance_dqt(self) -> Self {
        self.dqt(0, &STANDARD_LUMINANCE)
    }

    /// Standard chrominance table as table 1
    pub fn chrominance_dqt(self) -> Self {
        self.dqt(1, &STANDARD_CHROMINANCE)
    }

    /// Append a baseline SOF0 with three components
    pub fn sof(self, width: u16, height: u16) -> Self {
        let mut payload = vec![8];
        payload.extend_from_slice(&height.to_be_bytes());
        payload.extend_from_slice(&width.to_be_bytes());
        payload.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
        self.segment(0xC0, &payload)
    }

    /// Append SOS, filler scan data and EOI
    pub fn scan(self) -> Self {
        self.segment(SOS, &[1, 1, 0, 0, 63, 0])
            .raw(&FILLER_SCAN)
            .raw(&[MARKER_PREFIX, EOI])
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// A tagless JPEG: JFIF, both standard tables, a 64x48 frame and a scan
pub fn plain_jpeg() -> Vec<u8> {
    JpegBuilder::new()
        .jfif()
        .luminance_dqt()
        .chrominance_dqt()
        .sof(64, 48)
        .scan()
        .build()
}
