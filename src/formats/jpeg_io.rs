//! JPEG metadata reader
//!
//! A read pass walks the marker segments between SOI and the first SOS,
//! handing each one to a per-marker handler. Handlers pull tags and frame
//! properties out of the segment and classify it as metadata or not; the
//! classification drives the [`MetadataRegion`] bookkeeping that a later save
//! relies on.

use super::region::MetadataRegion;
use crate::{
    error::{Error, Result},
    properties::{FrameInfo, Properties, ReadStyle},
    quality,
    segment::{
        is_sof, marker_label, read_segment_marker, read_segment_size, validate_header, Segment,
        SegmentClass, APP0, APP1, COM, DQT, EOI, SOS,
    },
    store::{ByteStore, MemoryStore},
    tags::{CommentTag, ExifTag, ImageTagSet, Tag, TagKind},
    tiff::Endian,
    xmp::XmpTag,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::{
    io::{Cursor, SeekFrom},
    path::Path,
};

pub(crate) const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";
pub(crate) const EXIF_IDENTIFIER: &[u8] = b"Exif\0\0";
pub(crate) const XMP_IDENTIFIER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Exif identifier + byte order + magic + first IFD offset
const EXIF_HEADER_LEN: usize = 14;
pub(crate) const TIFF_MAGIC: u16 = 42;

/// A JFIF header is only honored when its payload starts here
/// (SOI + APP0 marker + size field)
const JFIF_PAYLOAD_OFFSET: u64 = 6;

/// A JPEG file with its metadata tags loaded
///
/// The file owns its byte store. Reading happens in [`JpegFile::read`];
/// changes made through [`JpegFile::tags_mut`] reach the store on
/// [`JpegFile::save`].
///
/// # Example
///
/// ```no_run
/// use jpeg_tag_io::{CommentTag, JpegFile, Tag};
///
/// # fn main() -> jpeg_tag_io::Result<()> {
/// let mut file = JpegFile::open("photo.jpg")?;
/// if let Some(props) = file.properties() {
///     println!("{}x{} q{}", props.width, props.height, props.quality);
/// }
/// file.tags_mut().insert(Tag::Comment(CommentTag::new("edited")));
/// file.write_to("photo.jpg")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JpegFile<S: ByteStore> {
    pub(crate) store: S,
    pub(crate) tags: ImageTagSet,
    pub(crate) region: MetadataRegion,
    /// Verbatim APP0 JFIF segment, marker included
    pub(crate) jfif_header: Option<Vec<u8>>,
    frame: FrameInfo,
    style: ReadStyle,
}

impl JpegFile<MemoryStore> {
    /// Read a JPEG held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::read(Cursor::new(bytes))
    }

    /// Read a JPEG file into memory
    ///
    /// The file handle is closed before this returns; use
    /// [`JpegFile::write_to`] to store the result.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Current bytes of the in-memory file
    pub fn as_bytes(&self) -> &[u8] {
        self.store.get_ref()
    }
}

impl<S: ByteStore> JpegFile<S> {
    /// Read tags and properties from a store
    pub fn read(store: S) -> Result<Self> {
        Self::read_with_style(store, ReadStyle::default())
    }

    /// Read from a store with an explicit [`ReadStyle`]
    pub fn read_with_style(mut store: S, style: ReadStyle) -> Result<Self> {
        store.seek(SeekFrom::Start(0))?;
        validate_header(&mut store)?;

        let mut file = Self {
            store,
            tags: ImageTagSet::new(),
            region: MetadataRegion::default(),
            jfif_header: None,
            frame: FrameInfo::default(),
            style,
        };
        file.read_metadata()?;
        Ok(file)
    }

    pub fn tags(&self) -> &ImageTagSet {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut ImageTagSet {
        &mut self.tags
    }

    /// Frame properties, or `None` when no frame header was read
    pub fn properties(&self) -> Option<Properties> {
        if !self.style.reads_properties() {
            return None;
        }
        self.frame.properties()
    }

    /// Length of the contiguous metadata block after SOI
    pub fn metadata_length(&self) -> u64 {
        self.region.length()
    }

    /// Marker offset of a tag's segment outside the metadata block, 0 if none
    pub fn scattered_position(&self, kind: TagKind) -> u64 {
        self.region.position(kind)
    }

    /// The original JFIF APP0 segment, if one was found
    pub fn jfif_header(&self) -> Option<&[u8]> {
        self.jfif_header.as_deref()
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn read_metadata(&mut self) -> Result<()> {
        let file_len = self.store.byte_len()?;

        loop {
            let offset = self.store.stream_position()?;
            let marker = read_segment_marker(&mut self.store)?;

            // Entropy-coded data is never scanned
            if marker == EOI || marker == SOS {
                log::debug!("{} at {}, metadata scan done", marker_label(marker), offset);
                break;
            }

            let position = offset + 2;
            let size = read_segment_size(&mut self.store, position, file_len)?;
            let segment = Segment {
                marker,
                offset,
                size,
            };

            let class = self.read_segment(&segment)?;
            log::debug!(
                "{} at {}: {} bytes, {:?}",
                marker_label(marker),
                offset,
                size,
                class
            );
            self.region.record(size, class);

            // Handlers may stop short of the payload end
            self.store.seek(SeekFrom::Start(position + size as u64))?;
        }

        Ok(())
    }

    /// Dispatch a segment to its handler; the cursor is at the payload
    fn read_segment(&mut self, segment: &Segment) -> Result<SegmentClass> {
        match segment.marker {
            APP0 => self.read_jfif(segment),
            APP1 => self.read_app1(segment),
            COM => self.read_comment(segment),
            DQT => self.read_dqt(segment),
            marker if is_sof(marker) => self.read_sof(segment),
            _ => Ok(SegmentClass::Other),
        }
    }

    fn read_jfif(&mut self, segment: &Segment) -> Result<SegmentClass> {
        if segment.payload().offset != JFIF_PAYLOAD_OFFSET
            || segment.payload_len() < JFIF_IDENTIFIER.len()
        {
            return Ok(SegmentClass::Other);
        }

        let mut identifier = [0u8; 5];
        self.store.read_exact(&mut identifier)?;
        if identifier != JFIF_IDENTIFIER {
            return Ok(SegmentClass::Other);
        }

        let mut header = vec![0u8; segment.total_len() as usize];
        self.store.seek(SeekFrom::Start(segment.offset))?;
        self.store.read_exact(&mut header)?;
        self.jfif_header = Some(header);
        Ok(SegmentClass::Metadata)
    }

    fn read_app1(&mut self, segment: &Segment) -> Result<SegmentClass> {
        let length = segment.payload_len();
        let mut header = Vec::with_capacity(XMP_IDENTIFIER.len());

        if self.tags.exif().is_none() && length >= EXIF_HEADER_LEN {
            header.resize(EXIF_HEADER_LEN, 0);
            self.store.read_exact(&mut header)?;
            if header.starts_with(EXIF_IDENTIFIER) {
                return self.read_exif(segment, &header);
            }
        }

        if length >= XMP_IDENTIFIER.len() {
            let have = header.len();
            header.resize(XMP_IDENTIFIER.len(), 0);
            self.store.read_exact(&mut header[have..])?;
            if header == XMP_IDENTIFIER {
                return self.read_xmp(segment);
            }
        }

        Ok(SegmentClass::Other)
    }

    /// `header` holds the first [`EXIF_HEADER_LEN`] payload bytes
    fn read_exif(&mut self, segment: &Segment, header: &[u8]) -> Result<SegmentClass> {
        let tiff_header = &header[EXIF_IDENTIFIER.len()..EXIF_HEADER_LEN];

        // Past the identifier the TIFF header is taken as given, so a bad
        // byte order or magic means the file is corrupt.
        let endian = Endian::from_tag(&tiff_header[..2]).ok_or_else(|| Error::InvalidSegment {
            offset: segment.offset,
            reason: format!("unknown Exif byte order {:02X?}", &tiff_header[..2]),
        })?;
        let magic = endian.read_u16(&tiff_header[2..4]);
        if magic != TIFF_MAGIC {
            return Err(Error::InvalidExifMagic {
                offset: segment.offset,
                magic,
            });
        }
        let ifd_offset = endian.read_u32(&tiff_header[4..8]);

        let mut body = vec![0u8; segment.payload_len() - EXIF_IDENTIFIER.len()];
        body[..tiff_header.len()].copy_from_slice(tiff_header);
        self.store.read_exact(&mut body[tiff_header.len()..])?;

        match ExifTag::decode(&body, endian, ifd_offset) {
            Ok(exif) => {
                self.tags.insert(Tag::Exif(exif));
                self.region.mark(TagKind::Exif, segment.offset);
                Ok(SegmentClass::Metadata)
            }
            Err(e) => {
                log::warn!("Leaving undecodable Exif at {} in place: {}", segment.offset, e);
                Ok(SegmentClass::Other)
            }
        }
    }

    /// The cursor is just past the XMP identifier
    fn read_xmp(&mut self, segment: &Segment) -> Result<SegmentClass> {
        let mut packet = vec![0u8; segment.payload_len() - XMP_IDENTIFIER.len()];
        self.store.read_exact(&mut packet)?;

        match XmpTag::decode_bytes(&packet) {
            Ok(xmp) => {
                self.tags.insert(Tag::Xmp(xmp));
                self.region.mark(TagKind::Xmp, segment.offset);
                Ok(SegmentClass::Metadata)
            }
            Err(e) => {
                log::warn!("Leaving malformed XMP at {} in place: {}", segment.offset, e);
                Ok(SegmentClass::Other)
            }
        }
    }

    fn read_comment(&mut self, segment: &Segment) -> Result<SegmentClass> {
        if self.tags.comment().is_some() {
            return Ok(SegmentClass::Other);
        }

        let mut text = vec![0u8; segment.payload_len()];
        self.store.read_exact(&mut text)?;
        if text.last() == Some(&0) {
            text.pop();
        }

        self.tags.insert(Tag::Comment(CommentTag::decode(&text)));
        self.region.mark(TagKind::Comment, segment.offset);
        Ok(SegmentClass::Metadata)
    }

    fn read_sof(&mut self, segment: &Segment) -> Result<SegmentClass> {
        if self.style.reads_properties() && segment.payload_len() >= 5 {
            let _precision = self.store.read_u8()?;
            let height = self.store.read_u16::<BigEndian>()?;
            let width = self.store.read_u16::<BigEndian>()?;
            self.frame.dimensions = Some((width, height));
        }
        // Frame headers belong to the image stream and never move
        Ok(SegmentClass::Other)
    }

    fn read_dqt(&mut self, segment: &Segment) -> Result<SegmentClass> {
        if self.style.reads_properties() {
            let mut payload = vec![0u8; segment.payload_len()];
            self.store.read_exact(&mut payload)?;
            if let Some(estimate) = quality::estimate_quality(&payload) {
                self.frame.record_quality(estimate);
            }
        }
        Ok(SegmentClass::Other)
    }
}
