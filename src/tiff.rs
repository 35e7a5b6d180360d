//! Minimal TIFF/Exif tag-tree codec
//!
//! This module decodes the TIFF body of an Exif APP1 segment into an [`Ifd`]
//! tree and encodes it back. It understands enough of the format to
//! round-trip typical camera metadata:
//!
//! - IFD chains (IFD0 → IFD1)
//! - Exif, GPS and Interoperability sub-IFDs
//! - The JPEG thumbnail referenced from IFD1
//!
//! TIFF Structure:
//! - Header: byte order (II/MM), magic (0x002A), IFD offset
//! - IFD (Image File Directory): tag count, tags (12 bytes each), next IFD offset
//! - Tags: tag ID (2), type (2), count (4), value/offset (4)
//!
//! Offsets inside the body are relative to the start of the TIFF header. The
//! encoder always writes big-endian.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use std::collections::{BTreeMap, HashSet};

/// TIFF/Exif tag IDs
pub mod tags {
    // IFD0 (main image) tags
    pub const IMAGE_WIDTH: u16 = 0x0100;
    pub const IMAGE_LENGTH: u16 = 0x0101;
    pub const IMAGE_DESCRIPTION: u16 = 0x010E;
    pub const MAKE: u16 = 0x010F;
    pub const MODEL: u16 = 0x0110;
    pub const ORIENTATION: u16 = 0x0112;
    pub const SOFTWARE: u16 = 0x0131;
    pub const DATE_TIME: u16 = 0x0132;
    pub const ARTIST: u16 = 0x013B;
    pub const COPYRIGHT: u16 = 0x8298;
    pub const EXIF_IFD_POINTER: u16 = 0x8769;
    pub const GPS_IFD_POINTER: u16 = 0x8825;

    // EXIF sub-IFD tags
    pub const EXPOSURE_TIME: u16 = 0x829A;
    pub const F_NUMBER: u16 = 0x829D;
    pub const ISO_SPEED: u16 = 0x8827;
    pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const FOCAL_LENGTH: u16 = 0x920A;
    pub const USER_COMMENT: u16 = 0x9286;
    pub const INTEROP_IFD_POINTER: u16 = 0xA005;

    // IFD1 (thumbnail) tags
    pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
    pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;
}

/// TIFF data types
mod types {
    pub const BYTE: u16 = 1;
    pub const ASCII: u16 = 2;
    pub const SHORT: u16 = 3;
    pub const LONG: u16 = 4;
    pub const RATIONAL: u16 = 5;
    pub const SBYTE: u16 = 6;
    pub const UNDEFINED: u16 = 7;
    pub const SSHORT: u16 = 8;
    pub const SLONG: u16 = 9;
    pub const SRATIONAL: u16 = 10;
    pub const FLOAT: u16 = 11;
    pub const DOUBLE: u16 = 12;
    pub const IFD: u16 = 13;
}

/// Maximum number of tags in an IFD (prevents DOS attacks)
const MAX_IFD_TAGS: u16 = 1000;

/// Longest IFD chain kept; real files stop at IFD1
pub const MAX_IFD_CHAIN: usize = 32;

/// Deepest sub-IFD nesting followed (Exif -> Interop is 2)
const MAX_SUB_IFD_DEPTH: usize = 4;

/// Size of the TIFF header that precedes the first IFD written by [`encode`]
pub const TIFF_HEADER_LEN: u32 = 8;

/// Byte order for reading multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// "II"
    Little,
    /// "MM"
    Big,
}

impl Endian {
    /// Byte order from the two-byte TIFF indicator
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"II" => Some(Endian::Little),
            b"MM" => Some(Endian::Big),
            _ => None,
        }
    }

    pub fn read_u16(&self, data: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(data),
            Endian::Big => BigEndian::read_u16(data),
        }
    }

    pub fn read_u32(&self, data: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(data),
            Endian::Big => BigEndian::read_u32(data),
        }
    }

    fn read_u64(&self, data: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_u64(data),
            Endian::Big => BigEndian::read_u64(data),
        }
    }
}

/// A typed tag value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(Vec<u8>),
    /// Raw bytes, usually NUL terminated
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl Value {
    /// ASCII value from a string, with the terminating NUL added
    pub fn ascii(text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        Value::Ascii(bytes)
    }

    /// Text of an ASCII value, trimmed of NUL padding and whitespace
    pub fn as_str(&self) -> Option<String> {
        match self {
            Value::Ascii(bytes) => String::from_utf8(bytes.clone())
                .ok()
                .map(|s| s.trim_end_matches('\0').trim().to_string())
                .filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// First element of an unsigned integer value
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Byte(v) => v.first().map(|&x| x as u32),
            Value::Short(v) => v.first().map(|&x| x as u32),
            Value::Long(v) => v.first().copied(),
            _ => None,
        }
    }

    fn type_id(&self) -> u16 {
        match self {
            Value::Byte(_) => types::BYTE,
            Value::Ascii(_) => types::ASCII,
            Value::Short(_) => types::SHORT,
            Value::Long(_) => types::LONG,
            Value::Rational(_) => types::RATIONAL,
            Value::SByte(_) => types::SBYTE,
            Value::Undefined(_) => types::UNDEFINED,
            Value::SShort(_) => types::SSHORT,
            Value::SLong(_) => types::SLONG,
            Value::SRational(_) => types::SRATIONAL,
            Value::Float(_) => types::FLOAT,
            Value::Double(_) => types::DOUBLE,
        }
    }

    fn count(&self) -> usize {
        match self {
            Value::Byte(v) | Value::Ascii(v) | Value::Undefined(v) => v.len(),
            Value::SByte(v) => v.len(),
            Value::Short(v) => v.len(),
            Value::SShort(v) => v.len(),
            Value::Long(v) => v.len(),
            Value::SLong(v) => v.len(),
            Value::Rational(v) => v.len(),
            Value::SRational(v) => v.len(),
            Value::Float(v) => v.len(),
            Value::Double(v) => v.len(),
        }
    }

    fn decode(type_id: u16, count: usize, raw: &[u8], endian: Endian) -> Option<Self> {
        let chunks = |width: usize| raw.chunks_exact(width).take(count);
        let value = match type_id {
            types::BYTE => Value::Byte(raw.to_vec()),
            types::ASCII => Value::Ascii(raw.to_vec()),
            types::UNDEFINED => Value::Undefined(raw.to_vec()),
            types::SBYTE => Value::SByte(raw.iter().map(|&b| b as i8).collect()),
            types::SHORT => Value::Short(chunks(2).map(|c| endian.read_u16(c)).collect()),
            types::SSHORT => Value::SShort(chunks(2).map(|c| endian.read_u16(c) as i16).collect()),
            types::LONG | types::IFD => {
                Value::Long(chunks(4).map(|c| endian.read_u32(c)).collect())
            }
            types::SLONG => Value::SLong(chunks(4).map(|c| endian.read_u32(c) as i32).collect()),
            types::RATIONAL => Value::Rational(
                chunks(8)
                    .map(|c| (endian.read_u32(&c[..4]), endian.read_u32(&c[4..])))
                    .collect(),
            ),
            types::SRATIONAL => Value::SRational(
                chunks(8)
                    .map(|c| (endian.read_u32(&c[..4]) as i32, endian.read_u32(&c[4..]) as i32))
                    .collect(),
            ),
            types::FLOAT => {
                Value::Float(chunks(4).map(|c| f32::from_bits(endian.read_u32(c))).collect())
            }
            types::DOUBLE => {
                Value::Double(chunks(8).map(|c| f64::from_bits(endian.read_u64(c))).collect())
            }
            _ => return None,
        };
        Some(value)
    }

    /// Big-endian encoding of the value body
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writes into a Vec cannot fail.
        let _ = self.write_be(&mut out);
        out
    }

    fn write_be(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        match self {
            Value::Byte(v) | Value::Ascii(v) | Value::Undefined(v) => out.extend_from_slice(v),
            Value::SByte(v) => out.extend(v.iter().map(|&b| b as u8)),
            Value::Short(v) => {
                for &x in v {
                    out.write_u16::<BigEndian>(x)?;
                }
            }
            Value::SShort(v) => {
                for &x in v {
                    out.write_i16::<BigEndian>(x)?;
                }
            }
            Value::Long(v) => {
                for &x in v {
                    out.write_u32::<BigEndian>(x)?;
                }
            }
            Value::SLong(v) => {
                for &x in v {
                    out.write_i32::<BigEndian>(x)?;
                }
            }
            Value::Rational(v) => {
                for &(n, d) in v {
                    out.write_u32::<BigEndian>(n)?;
                    out.write_u32::<BigEndian>(d)?;
                }
            }
            Value::SRational(v) => {
                for &(n, d) in v {
                    out.write_i32::<BigEndian>(n)?;
                    out.write_i32::<BigEndian>(d)?;
                }
            }
            Value::Float(v) => {
                for &x in v {
                    out.write_f32::<BigEndian>(x)?;
                }
            }
            Value::Double(v) => {
                for &x in v {
                    out.write_f64::<BigEndian>(x)?;
                }
            }
        }
        Ok(())
    }
}

fn type_size(type_id: u16) -> Option<usize> {
    match type_id {
        types::BYTE | types::ASCII | types::SBYTE | types::UNDEFINED => Some(1),
        types::SHORT | types::SSHORT => Some(2),
        types::LONG | types::SLONG | types::FLOAT | types::IFD => Some(4),
        types::RATIONAL | types::SRATIONAL | types::DOUBLE => Some(8),
        _ => None,
    }
}

fn is_sub_ifd_pointer(tag: u16) -> bool {
    matches!(
        tag,
        tags::EXIF_IFD_POINTER | tags::GPS_IFD_POINTER | tags::INTEROP_IFD_POINTER
    )
}

/// One image file directory and the sub-directories hanging off it
///
/// Directories chained through the "next IFD" pointer are kept side by side
/// in a `Vec<Ifd>` (see [`decode`]), not nested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ifd {
    /// Plain entries, keyed (and therefore written) in tag order
    pub entries: BTreeMap<u16, Value>,
    /// Sub-directories keyed by their pointer tag (Exif, GPS, Interop)
    pub sub_ifds: BTreeMap<u16, Ifd>,
    /// JPEG thumbnail referenced by this directory
    pub thumbnail: Option<Vec<u8>>,
}

impl Ifd {
    /// True if the directory and its children hold nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.sub_ifds.is_empty() && self.thumbnail.is_none()
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    endian: Endian,
    visited: HashSet<u32>,
}

impl Decoder<'_> {
    /// Walk the IFD chain starting at `first`
    fn chain(&mut self, first: u32) -> Result<Vec<Ifd>> {
        let (ifd, mut next) = self.ifd(first, 0)?;
        let mut ifds = vec![ifd];

        while next != 0 {
            if ifds.len() >= MAX_IFD_CHAIN {
                log::warn!("Truncating IFD chain after {} directories", MAX_IFD_CHAIN);
                break;
            }
            match self.ifd(next, 0) {
                Ok((ifd, following)) => {
                    ifds.push(ifd);
                    next = following;
                }
                Err(e) => {
                    log::warn!("Ignoring next IFD: {}", e);
                    break;
                }
            }
        }

        Ok(ifds)
    }

    /// Decode one directory; also returns its next-IFD offset (0 for none)
    fn ifd(&mut self, offset: u32, depth: usize) -> Result<(Ifd, u32)> {
        let data = self.data;
        let start = offset as usize;
        if start + 2 > data.len() {
            return Err(Error::InvalidExif(format!(
                "IFD offset {} beyond {} bytes of TIFF data",
                offset,
                data.len()
            )));
        }
        if !self.visited.insert(offset) {
            return Err(Error::InvalidExif(format!("IFD loop at offset {}", offset)));
        }

        let tag_count = self.endian.read_u16(&data[start..]);
        if tag_count > MAX_IFD_TAGS {
            return Err(Error::InvalidExif(format!(
                "IFD at {} claims {} tags",
                offset, tag_count
            )));
        }

        let mut ifd = Ifd::default();
        let mut thumb_offset = None;
        let mut thumb_size = None;

        for i in 0..tag_count as usize {
            let entry_start = start + 2 + i * 12;
            let Some(entry) = data.get(entry_start..entry_start + 12) else {
                break;
            };

            let tag = self.endian.read_u16(&entry[0..2]);
            let type_id = self.endian.read_u16(&entry[2..4]);
            let count = self.endian.read_u32(&entry[4..8]) as usize;
            let value_or_offset = self.endian.read_u32(&entry[8..12]);

            if is_sub_ifd_pointer(tag) && matches!(type_id, types::LONG | types::IFD) {
                if depth >= MAX_SUB_IFD_DEPTH {
                    log::warn!("Skipping sub-IFD 0x{:04X}: nested too deeply", tag);
                    continue;
                }
                match self.ifd(value_or_offset, depth + 1) {
                    Ok((sub, _)) => {
                        ifd.sub_ifds.insert(tag, sub);
                    }
                    Err(e) => log::warn!("Skipping sub-IFD 0x{:04X}: {}", tag, e),
                }
                continue;
            }

            match tag {
                tags::JPEG_INTERCHANGE_FORMAT => {
                    thumb_offset = Some(value_or_offset);
                    continue;
                }
                tags::JPEG_INTERCHANGE_FORMAT_LENGTH => {
                    thumb_size = Some(value_or_offset);
                    continue;
                }
                _ => {}
            }

            let Some(width) = type_size(type_id) else {
                log::debug!("Skipping tag 0x{:04X} with unknown type {}", tag, type_id);
                continue;
            };
            let Some(len) = width.checked_mul(count) else {
                continue;
            };
            let raw = if len <= 4 {
                &entry[8..8 + len]
            } else {
                let at = value_or_offset as usize;
                match at.checked_add(len).and_then(|end| data.get(at..end)) {
                    Some(raw) => raw,
                    None => {
                        log::debug!("Skipping tag 0x{:04X}: value out of bounds", tag);
                        continue;
                    }
                }
            };

            if let Some(value) = Value::decode(type_id, count, raw, self.endian) {
                ifd.entries.insert(tag, value);
            }
        }

        // Both offset and size are required for a valid thumbnail
        if let (Some(at), Some(size)) = (thumb_offset, thumb_size) {
            let (at, size) = (at as usize, size as usize);
            match at.checked_add(size).and_then(|end| data.get(at..end)) {
                Some(bytes) => ifd.thumbnail = Some(bytes.to_vec()),
                None => log::warn!("Dropping out-of-bounds Exif thumbnail"),
            }
        }

        let next_at = start + 2 + tag_count as usize * 12;
        let next = data
            .get(next_at..next_at + 4)
            .map_or(0, |bytes| self.endian.read_u32(bytes));

        Ok((ifd, next))
    }
}

/// Decode the IFD chain of a TIFF body
///
/// `data` starts at the TIFF header; its length is the space available to the
/// tree. `ifd_offset` is the first-IFD offset from that header. The result
/// holds IFD0 first, followed by the directories it chains to (at most
/// [`MAX_IFD_CHAIN`]).
pub fn decode(data: &[u8], endian: Endian, ifd_offset: u32) -> Result<Vec<Ifd>> {
    let mut decoder = Decoder {
        data,
        endian,
        visited: HashSet::new(),
    };
    decoder.chain(ifd_offset)
}

struct Encoder {
    /// Encoded bytes; `buf[0]` sits at TIFF offset `base`
    buf: Vec<u8>,
    base: u32,
}

impl Encoder {
    fn offset(&self) -> u32 {
        self.base + self.buf.len() as u32
    }

    fn align(&mut self) {
        if self.buf.len() % 2 != 0 {
            self.buf.push(0);
        }
    }

    fn patch_u32(&mut self, at: usize, value: u32) {
        BigEndian::write_u32(&mut self.buf[at..at + 4], value);
    }

    /// Write one directory; returns where its next-IFD pointer sits in `buf`
    fn ifd(&mut self, ifd: &Ifd, depth: usize) -> Result<usize> {
        enum Slot<'a> {
            Value(&'a Value),
            Pointer(u16),
            ThumbOffset,
            ThumbLength(u32),
        }

        if depth > MAX_SUB_IFD_DEPTH {
            return Err(Error::InvalidExif("sub-IFDs nested too deeply".into()));
        }

        let mut slots: Vec<(u16, Slot)> = ifd
            .entries
            .iter()
            .filter(|(tag, _)| {
                !is_sub_ifd_pointer(**tag)
                    && **tag != tags::JPEG_INTERCHANGE_FORMAT
                    && **tag != tags::JPEG_INTERCHANGE_FORMAT_LENGTH
            })
            .map(|(&tag, value)| (tag, Slot::Value(value)))
            .collect();
        slots.extend(ifd.sub_ifds.keys().map(|&tag| (tag, Slot::Pointer(tag))));
        if let Some(thumbnail) = &ifd.thumbnail {
            slots.push((tags::JPEG_INTERCHANGE_FORMAT, Slot::ThumbOffset));
            slots.push((
                tags::JPEG_INTERCHANGE_FORMAT_LENGTH,
                Slot::ThumbLength(thumbnail.len() as u32),
            ));
        }
        slots.sort_by_key(|(tag, _)| *tag);

        if slots.len() > MAX_IFD_TAGS as usize {
            return Err(Error::InvalidExif(format!("{} tags in one IFD", slots.len())));
        }

        self.align();
        let dir = self.buf.len();
        self.buf.write_u16::<BigEndian>(slots.len() as u16)?;
        self.buf.resize(dir + 2 + slots.len() * 12 + 4, 0);

        let mut pointers = Vec::new();
        let mut thumb_patch = None;

        for (i, (tag, slot)) in slots.iter().enumerate() {
            let at = dir + 2 + i * 12;
            BigEndian::write_u16(&mut self.buf[at..at + 2], *tag);
            match slot {
                Slot::Value(value) => {
                    let count = u32::try_from(value.count()).map_err(|_| {
                        Error::InvalidExif(format!("tag 0x{:04X} has too many values", tag))
                    })?;
                    BigEndian::write_u16(&mut self.buf[at + 2..at + 4], value.type_id());
                    BigEndian::write_u32(&mut self.buf[at + 4..at + 8], count);
                    let body = value.encode();
                    if body.len() <= 4 {
                        self.buf[at + 8..at + 8 + body.len()].copy_from_slice(&body);
                    } else {
                        self.align();
                        let value_offset = self.offset();
                        self.buf.extend_from_slice(&body);
                        self.patch_u32(at + 8, value_offset);
                    }
                }
                Slot::Pointer(pointer) => {
                    BigEndian::write_u16(&mut self.buf[at + 2..at + 4], types::LONG);
                    BigEndian::write_u32(&mut self.buf[at + 4..at + 8], 1);
                    pointers.push((at + 8, *pointer));
                }
                Slot::ThumbOffset => {
                    BigEndian::write_u16(&mut self.buf[at + 2..at + 4], types::LONG);
                    BigEndian::write_u32(&mut self.buf[at + 4..at + 8], 1);
                    thumb_patch = Some(at + 8);
                }
                Slot::ThumbLength(len) => {
                    BigEndian::write_u16(&mut self.buf[at + 2..at + 4], types::LONG);
                    BigEndian::write_u32(&mut self.buf[at + 4..at + 8], 1);
                    self.patch_u32(at + 8, *len);
                }
            }
        }

        for (at, tag) in pointers {
            if let Some(sub) = ifd.sub_ifds.get(&tag) {
                self.align();
                let sub_offset = self.offset();
                self.patch_u32(at, sub_offset);
                self.ifd(sub, depth + 1)?;
            }
        }

        if let (Some(at), Some(thumbnail)) = (thumb_patch, &ifd.thumbnail) {
            let thumb_offset = self.offset();
            self.buf.extend_from_slice(thumbnail);
            self.patch_u32(at, thumb_offset);
        }

        Ok(dir + 2 + slots.len() * 12)
    }
}

/// Encode an IFD chain as a big-endian TIFF body, minus its header
///
/// The first directory is laid out at `first_ifd_offset`, each following one
/// is linked from its predecessor's next-IFD pointer, and every offset in the
/// output is relative to the start of the (omitted) TIFF header.
pub fn encode<'a, I>(ifds: I, first_ifd_offset: u32) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Ifd>,
{
    let mut encoder = Encoder {
        buf: Vec::new(),
        base: first_ifd_offset,
    };

    let mut next_pointer = None;
    for ifd in ifds {
        encoder.align();
        let offset = encoder.offset();
        if let Some(at) = next_pointer {
            encoder.patch_u32(at, offset);
        }
        next_pointer = Some(encoder.ifd(ifd, 0)?);
    }

    Ok(encoder.buf)
}

/// Basic EXIF metadata extracted from IFD0
#[derive(Debug, Default)]
pub struct ExifInfo {
    /// Camera manufacturer (e.g., "Canon", "Nikon")
    pub make: Option<String>,
    /// Camera model (e.g., "EOS R5", "D850")
    pub model: Option<String>,
    /// Image orientation (1-8, where 1 is normal)
    pub orientation: Option<u16>,
    /// Software used to create/edit the image
    pub software: Option<String>,
    /// Date and time of image creation (format: "YYYY:MM:DD HH:MM:SS")
    pub date_time: Option<String>,
    /// Original capture date/time (from EXIF sub-IFD)
    pub date_time_original: Option<String>,
    /// Artist/photographer name
    pub artist: Option<String>,
    /// Copyright notice
    pub copyright: Option<String>,
}

impl ExifInfo {
    /// Summarize the well-known fields of a tag tree
    pub fn from_ifd(ifd: &Ifd) -> Self {
        let text = |tag| ifd.entries.get(&tag).and_then(Value::as_str);
        Self {
            make: text(tags::MAKE),
            model: text(tags::MODEL),
            orientation: ifd
                .entries
                .get(&tags::ORIENTATION)
                .and_then(Value::as_u32)
                .map(|v| v as u16),
            software: text(tags::SOFTWARE),
            date_time: text(tags::DATE_TIME),
            date_time_original: ifd
                .sub_ifds
                .get(&tags::EXIF_IFD_POINTER)
                .and_then(|exif| exif.entries.get(&tags::DATE_TIME_ORIGINAL))
                .and_then(Value::as_str),
            artist: text(tags::ARTIST),
            copyright: text(tags::COPYRIGHT),
        }
    }
}

impl std::fmt::Display for ExifInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref make) = self.make {
            parts.push(make.clone());
        }
        if let Some(ref model) = self.model {
            parts.push(model.clone());
        }
        if let Some(dt) = self.date_time_original.as_ref().or(self.date_time.as_ref()) {
            parts.push(dt.clone());
        }
        if parts.is_empty() {
            write!(f, "(no metadata)")
        } else {
            write!(f, "{}", parts.join(" | "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian TIFF body with IFD0 (Make, Orientation, Exif pointer)
    /// and an Exif IFD holding DateTimeOriginal.
    fn little_endian_body() -> Vec<u8> {
        let mut d = Vec::new();
        d.extend_from_slice(b"II");
        d.extend_from_slice(&42u16.to_le_bytes());
        d.extend_from_slice(&8u32.to_le_bytes());

        // IFD0 at 8: 3 entries -> 2 + 36 + 4 = 42 bytes, data at 50
        d.extend_from_slice(&3u16.to_le_bytes());
        // Make "Canon\0" (6 bytes, out of line at 50)
        d.extend_from_slice(&tags::MAKE.to_le_bytes());
        d.extend_from_slice(&types::ASCII.to_le_bytes());
        d.extend_from_slice(&6u32.to_le_bytes());
        d.extend_from_slice(&50u32.to_le_bytes());
        // Orientation = 6 (inline)
        d.extend_from_slice(&tags::ORIENTATION.to_le_bytes());
        d.extend_from_slice(&types::SHORT.to_le_bytes());
        d.extend_from_slice(&1u32.to_le_bytes());
        d.extend_from_slice(&[6, 0, 0, 0]);
        // Exif pointer -> 56
        d.extend_from_slice(&tags::EXIF_IFD_POINTER.to_le_bytes());
        d.extend_from_slice(&types::LONG.to_le_bytes());
        d.extend_from_slice(&1u32.to_le_bytes());
        d.extend_from_slice(&56u32.to_le_bytes());
        // next IFD
        d.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(d.len(), 50);
        d.extend_from_slice(b"Canon\0");

        // Exif IFD at 56: 1 entry, data at 74
        d.extend_from_slice(&1u16.to_le_bytes());
        d.extend_from_slice(&tags::DATE_TIME_ORIGINAL.to_le_bytes());
        d.extend_from_slice(&types::ASCII.to_le_bytes());
        d.extend_from_slice(&20u32.to_le_bytes());
        d.extend_from_slice(&74u32.to_le_bytes());
        d.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(d.len(), 74);
        d.extend_from_slice(b"2024:01:02 03:04:05\0");
        d
    }

    #[test]
    fn test_endian() {
        assert_eq!(Endian::from_tag(b"II"), Some(Endian::Little));
        assert_eq!(Endian::from_tag(b"MM"), Some(Endian::Big));
        assert_eq!(Endian::from_tag(b"XX"), None);

        assert_eq!(Endian::Big.read_u16(&[0x12, 0x34]), 0x1234);
        assert_eq!(Endian::Little.read_u16(&[0x34, 0x12]), 0x1234);
        assert_eq!(Endian::Big.read_u32(&[0x12, 0x34, 0x56, 0x78]), 0x12345678);
        assert_eq!(Endian::Little.read_u32(&[0x78, 0x56, 0x34, 0x12]), 0x12345678);
    }

    #[test]
    fn test_decode_little_endian() {
        let chain = decode(&little_endian_body(), Endian::Little, 8).unwrap();
        assert_eq!(chain.len(), 1);
        let ifd = &chain[0];

        assert_eq!(ifd.entries[&tags::MAKE].as_str().as_deref(), Some("Canon"));
        assert_eq!(ifd.entries[&tags::ORIENTATION], Value::Short(vec![6]));
        assert!(!ifd.entries.contains_key(&tags::EXIF_IFD_POINTER));

        let info = ExifInfo::from_ifd(ifd);
        assert_eq!(info.make.as_deref(), Some("Canon"));
        assert_eq!(info.orientation, Some(6));
        assert_eq!(info.date_time_original.as_deref(), Some("2024:01:02 03:04:05"));
        assert_eq!(info.to_string(), "Canon | 2024:01:02 03:04:05");
    }

    #[test]
    fn test_encode_then_decode_big_endian() {
        let original = decode(&little_endian_body(), Endian::Little, 8).unwrap();

        let body = encode(&original, TIFF_HEADER_LEN).unwrap();
        let mut tiff = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
        tiff.extend_from_slice(&body);

        let decoded = decode(&tiff, Endian::Big, TIFF_HEADER_LEN).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_thumbnail_and_next_ifd_survive_encoding() {
        let mut ifd1 = Ifd::default();
        ifd1.entries.insert(tags::IMAGE_WIDTH, Value::Long(vec![160]));
        ifd1.thumbnail = Some(vec![0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9]);

        let mut ifd0 = Ifd::default();
        ifd0.entries.insert(tags::MODEL, Value::ascii("Test Camera"));
        ifd0.entries
            .insert(tags::EXPOSURE_TIME, Value::Rational(vec![(1, 250)]));
        ifd0.entries.insert(tags::FOCAL_LENGTH, Value::SRational(vec![(-35, 10)]));
        ifd0.entries.insert(0x9999, Value::Double(vec![1.5, -2.25]));
        let chain = vec![ifd0, ifd1];

        let mut tiff = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
        tiff.extend_from_slice(&encode(&chain, TIFF_HEADER_LEN).unwrap());

        let decoded = decode(&tiff, Endian::Big, TIFF_HEADER_LEN).unwrap();
        assert_eq!(decoded, chain);
    }

    #[test]
    fn test_decode_rejects_bad_offsets_and_loops() {
        let body = little_endian_body();
        assert!(matches!(
            decode(&body, Endian::Little, 10_000),
            Err(Error::InvalidExif(_))
        ));

        // IFD whose next pointer refers back to itself
        let mut looped = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
        looped.extend_from_slice(&0u16.to_be_bytes());
        looped.extend_from_slice(&8u32.to_be_bytes());
        let chain = decode(&looped, Endian::Big, 8).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(chain[0].is_empty());
    }

    #[test]
    fn test_out_of_bounds_value_is_skipped() {
        let mut d = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
        d.extend_from_slice(&1u16.to_be_bytes());
        d.extend_from_slice(&tags::MAKE.to_be_bytes());
        d.extend_from_slice(&types::ASCII.to_be_bytes());
        d.extend_from_slice(&100u32.to_be_bytes());
        d.extend_from_slice(&4000u32.to_be_bytes());
        d.extend_from_slice(&0u32.to_be_bytes());

        let chain = decode(&d, Endian::Big, 8).unwrap();
        assert!(chain[0].entries.is_empty());
    }

    #[test]
    fn test_long_chain_is_truncated() {
        // 5000 empty directories, each pointing at the one right after it
        const COUNT: u32 = 5000;
        let mut d = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
        for i in 0..COUNT {
            let next = if i + 1 == COUNT { 0 } else { 8 + (i + 1) * 6 };
            d.extend_from_slice(&0u16.to_be_bytes());
            d.extend_from_slice(&next.to_be_bytes());
        }

        let chain = decode(&d, Endian::Big, 8).unwrap();
        assert_eq!(chain.len(), MAX_IFD_CHAIN);

        // Dropping and re-encoding a chain this long must not recurse
        let body = encode(&chain, TIFF_HEADER_LEN).unwrap();
        assert_eq!(body.len(), MAX_IFD_CHAIN * 6);
    }

    #[test]
    fn test_deep_sub_ifds_are_cut() {
        // Each directory holds one Exif pointer to the next, 20 levels deep
        const LEVELS: u32 = 20;
        let mut d = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
        for i in 0..LEVELS {
            let child = 8 + (i + 1) * 18;
            d.extend_from_slice(&1u16.to_be_bytes());
            d.extend_from_slice(&tags::EXIF_IFD_POINTER.to_be_bytes());
            d.extend_from_slice(&types::LONG.to_be_bytes());
            d.extend_from_slice(&1u32.to_be_bytes());
            d.extend_from_slice(&child.to_be_bytes());
            d.extend_from_slice(&0u32.to_be_bytes());
        }
        d.extend_from_slice(&0u16.to_be_bytes());
        d.extend_from_slice(&0u32.to_be_bytes());

        let chain = decode(&d, Endian::Big, 8).unwrap();
        let mut depth = 0;
        let mut ifd = &chain[0];
        while let Some(sub) = ifd.sub_ifds.get(&tags::EXIF_IFD_POINTER) {
            depth += 1;
            ifd = sub;
        }
        assert_eq!(depth, MAX_SUB_IFD_DEPTH);

        // What was kept still encodes
        assert!(encode(&chain, TIFF_HEADER_LEN).is_ok());
    }
}
