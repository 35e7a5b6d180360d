//! Saving tags back into a JPEG
//!
//! A save renders the whole metadata block (JFIF, Exif, XMP, comment) in
//! memory first, so an oversized tag fails before the store is touched. It
//! then deletes metadata segments that were found outside the block, and
//! finally splices the new block over the old one right after SOI.

use super::jpeg_io::{JpegFile, EXIF_IDENTIFIER, TIFF_MAGIC, XMP_IDENTIFIER};
use super::region::BLOCK_START;
use crate::{
    error::{Error, Result},
    segment::{
        marker_label, read_segment_marker, read_segment_size, APP1, COM, MARKER_PREFIX,
        MAX_SEGMENT_SIZE,
    },
    store::{ByteStore, MemoryStore},
    tags::{CommentTag, ExifTag, ImageTagSet},
    tiff::TIFF_HEADER_LEN,
    xmp::XmpTag,
};
use byteorder::{BigEndian, WriteBytesExt};
use std::{
    io::{SeekFrom, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// JFIF 1.01, no units, 1x1 density, no thumbnail
pub const DEFAULT_JFIF_HEADER: [u8; 18] = [
    0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
    0x01, 0x00, 0x00,
];

/// Write one marker segment whose payload is the concatenation of `parts`
fn write_segment<W: Write>(
    writer: &mut W,
    marker: u8,
    label: &'static str,
    parts: &[&[u8]],
) -> Result<()> {
    let size = 2 + parts.iter().map(|part| part.len()).sum::<usize>();
    if size > MAX_SEGMENT_SIZE {
        return Err(Error::SegmentTooLarge {
            label,
            size,
            max: MAX_SEGMENT_SIZE,
        });
    }

    writer.write_u8(MARKER_PREFIX)?;
    writer.write_u8(marker)?;
    writer.write_u16::<BigEndian>(size as u16)?;
    for part in parts {
        writer.write_all(part)?;
    }
    Ok(())
}

/// Exif is always written big-endian with IFD0 right after the TIFF header
fn write_exif_segment<W: Write>(writer: &mut W, exif: &ExifTag) -> Result<()> {
    let body = exif.encode(TIFF_HEADER_LEN)?;
    write_segment(
        writer,
        APP1,
        "Exif",
        &[
            EXIF_IDENTIFIER,
            b"MM",
            &TIFF_MAGIC.to_be_bytes(),
            &TIFF_HEADER_LEN.to_be_bytes(),
            &body,
        ],
    )
}

fn write_xmp_segment<W: Write>(writer: &mut W, xmp: &XmpTag) -> Result<()> {
    write_segment(
        writer,
        APP1,
        "XMP",
        &[XMP_IDENTIFIER, xmp.encode().as_bytes()],
    )
}

fn write_comment_segment<W: Write>(writer: &mut W, comment: &CommentTag) -> Result<()> {
    write_segment(writer, COM, "Comment", &[&comment.encode()])
}

/// Render the metadata block that follows SOI
///
/// `jfif` is the verbatim APP0 segment read from the file; the default
/// header is used when the file had none.
pub(crate) fn render_block(jfif: Option<&[u8]>, tags: &ImageTagSet) -> Result<Vec<u8>> {
    let mut block = Vec::new();
    block.extend_from_slice(jfif.unwrap_or(&DEFAULT_JFIF_HEADER));

    if let Some(exif) = tags.exif() {
        write_exif_segment(&mut block, exif)?;
    }
    if let Some(xmp) = tags.xmp() {
        write_xmp_segment(&mut block, xmp)?;
    }
    if let Some(comment) = tags.comment() {
        write_comment_segment(&mut block, comment)?;
    }

    Ok(block)
}

impl<S: ByteStore> JpegFile<S> {
    /// Write the current tags back into the store
    ///
    /// Every segment is rendered and size-checked before anything is
    /// written; a [`Error::SegmentTooLarge`] leaves the store untouched.
    /// Metadata segments found outside the leading block are removed and
    /// all tags end up in one block right after SOI.
    pub fn save(&mut self) -> Result<()> {
        let block = render_block(self.jfif_header.as_deref(), &self.tags)?;

        self.delete_scattered()?;
        self.region.clear_scattered();

        self.store
            .splice(BLOCK_START, self.region.length(), &block)?;
        log::debug!(
            "Replaced {} byte metadata block with {} bytes",
            self.region.length(),
            block.len()
        );
        self.region.set_length(block.len() as u64);
        Ok(())
    }

    /// Remove scattered metadata segments, last one first
    ///
    /// Deleting from the end keeps the earlier recorded offsets valid. All
    /// offsets are still relative to the unspliced file, so the bound is the
    /// old block end even when the new block will reach past a segment.
    fn delete_scattered(&mut self) -> Result<()> {
        let block_end = self.region.end();

        for offset in self.region.scattered_descending() {
            if offset < block_end {
                break;
            }

            self.store.seek(SeekFrom::Start(offset))?;
            let marker = read_segment_marker(&mut self.store)?;
            let file_len = self.store.byte_len()?;
            let size = read_segment_size(&mut self.store, offset + 2, file_len)?;

            log::debug!(
                "Deleting scattered {} at {} ({} bytes)",
                marker_label(marker),
                offset,
                size
            );
            self.store.splice(offset, 2 + size as u64, &[])?;
        }

        Ok(())
    }
}

impl JpegFile<MemoryStore> {
    /// Save and write the result to `path`
    ///
    /// The bytes go to a uniquely named temporary file next to `path` which
    /// then replaces it, so `path` is never left half-written. The temporary
    /// file is removed if anything fails.
    pub fn write_to<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.save()?;

        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staging = NamedTempFile::new_in(dir)?;
        staging.write_all(self.store.get_ref())?;
        staging.as_file().sync_all()?;
        staging.persist(path).map_err(|e| e.error)?;

        log::debug!("Wrote {} bytes to {}", self.store.get_ref().len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::Tag;
    use std::io::{self, Cursor, Read, Seek};

    #[test]
    fn test_default_block_is_jfif_only() {
        let block = render_block(None, &ImageTagSet::new()).unwrap();
        assert_eq!(block, DEFAULT_JFIF_HEADER);
        assert_eq!(u16::from_be_bytes([block[2], block[3]]), 16);
    }

    #[test]
    fn test_block_order_and_sizes() {
        let mut tags = ImageTagSet::new();
        tags.insert(Tag::Comment(CommentTag::new("hi")));
        tags.add(crate::tags::TagKind::Exif);

        let block = render_block(None, &tags).unwrap();
        let exif = &block[DEFAULT_JFIF_HEADER.len()..];
        assert_eq!(&exif[..2], &[0xFF, APP1]);
        let exif_size = u16::from_be_bytes([exif[2], exif[3]]) as usize;
        assert_eq!(&exif[4..10], EXIF_IDENTIFIER);
        assert_eq!(&exif[10..18], &[b'M', b'M', 0, 42, 0, 0, 0, 8]);

        let comment = &exif[2 + exif_size..];
        assert_eq!(comment, &[0xFF, COM, 0x00, 0x05, b'h', b'i', 0]);
    }

    #[test]
    fn test_captured_jfif_is_reused() {
        let jfif = [
            0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x02, 0x01, 0x00, 0x48,
            0x00, 0x48, 0x00, 0x00,
        ];
        let block = render_block(Some(&jfif), &ImageTagSet::new()).unwrap();
        assert_eq!(block, jfif);
    }

    #[test]
    fn test_oversized_comment_is_rejected() {
        let mut tags = ImageTagSet::new();
        tags.insert(Tag::Comment(CommentTag::new("x".repeat(MAX_SEGMENT_SIZE))));

        match render_block(None, &tags) {
            Err(Error::SegmentTooLarge { label, size, max }) => {
                assert_eq!(label, "Comment");
                assert_eq!(size, MAX_SEGMENT_SIZE + 3);
                assert_eq!(max, MAX_SEGMENT_SIZE);
            }
            other => panic!("expected SegmentTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_largest_comment_fits() {
        let mut tags = ImageTagSet::new();
        // size field + text + NUL == 65535
        tags.insert(Tag::Comment(CommentTag::new("x".repeat(MAX_SEGMENT_SIZE - 3))));
        let block = render_block(None, &tags).unwrap();
        let comment = &block[DEFAULT_JFIF_HEADER.len()..];
        assert_eq!(&comment[2..4], &[0xFF, 0xFF]);
    }

    /// Memory store that logs every splice
    struct RecordingStore {
        inner: MemoryStore,
        splices: Vec<(u64, u64, usize)>,
    }

    impl Read for RecordingStore {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for RecordingStore {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl ByteStore for RecordingStore {
        fn byte_len(&mut self) -> Result<u64> {
            self.inner.byte_len()
        }

        fn splice(&mut self, offset: u64, remove: u64, insert: &[u8]) -> Result<()> {
            self.splices.push((offset, remove, insert.len()));
            self.inner.splice(offset, remove, insert)
        }
    }

    #[test]
    fn test_scattered_segments_deleted_back_to_front() {
        // SOI, DQT (freezes the block), COM, pad, APP1 Exif, SOS
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x03, 0x00]);
        let comment_at = bytes.len() as u64;
        bytes.extend_from_slice(&[0xFF, COM, 0x00, 0x04, b'a', 0]);
        bytes.extend_from_slice(&[0xFF, 0xE5, 0x00, 0x04, 1, 2]);
        let exif_at = bytes.len() as u64;
        let mut exif = vec![0xFF, APP1, 0x00, 0x00];
        exif.extend_from_slice(EXIF_IDENTIFIER);
        exif.extend_from_slice(&[b'M', b'M', 0, 42, 0, 0, 0, 8, 0, 0, 0, 0, 0, 0]);
        let size = (exif.len() - 2) as u16;
        exif[2..4].copy_from_slice(&size.to_be_bytes());
        bytes.extend_from_slice(&exif);
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]);

        let store = RecordingStore {
            inner: Cursor::new(bytes),
            splices: Vec::new(),
        };
        let mut file = JpegFile::read(store).unwrap();
        assert_eq!(file.metadata_length(), 0);
        assert_eq!(file.scattered_position(crate::TagKind::Comment), comment_at);
        assert_eq!(file.scattered_position(crate::TagKind::Exif), exif_at);

        file.save().unwrap();
        let store = file.into_inner();
        assert_eq!(
            store.splices,
            vec![
                (exif_at, exif.len() as u64, 0),
                (comment_at, 6, 0),
                (BLOCK_START, 0, store.splices[2].2),
            ]
        );

        let reread = JpegFile::read(store.inner).unwrap();
        assert_eq!(reread.tags().comment().unwrap().value, "a");
        assert!(reread.tags().exif().is_some());
        assert_eq!(reread.scattered_position(crate::TagKind::Exif), 0);
    }
}
