//! Random-access byte stores
//!
//! The scanner and writer never touch a file directly. They work against a
//! [`ByteStore`]: anything that can read at a cursor, seek absolutely, report
//! its length and replace a byte range with new content.

use crate::error::{Error, Result};
use std::{
    fs::File,
    io::{Cursor, Read, Seek, SeekFrom, Write},
};

/// In-memory store used for unit tests and staged rewrites
pub type MemoryStore = Cursor<Vec<u8>>;

/// Random-access storage for a JPEG stream
pub trait ByteStore: Read + Seek {
    /// Total length of the stream in bytes
    fn byte_len(&mut self) -> Result<u64>;

    /// Replace `remove` bytes at `offset` with `insert`
    ///
    /// Everything after the replaced range shifts by the size delta. The
    /// cursor is left at the end of the inserted bytes.
    fn splice(&mut self, offset: u64, remove: u64, insert: &[u8]) -> Result<()>;
}

fn check_range(offset: u64, remove: u64, len: u64) -> Result<()> {
    match offset.checked_add(remove) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::InvalidSegment {
            offset,
            reason: format!("splice of {} bytes exceeds stream length {}", remove, len),
        }),
    }
}

impl ByteStore for Cursor<Vec<u8>> {
    fn byte_len(&mut self) -> Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn splice(&mut self, offset: u64, remove: u64, insert: &[u8]) -> Result<()> {
        check_range(offset, remove, self.get_ref().len() as u64)?;
        let start = offset as usize;
        let end = start + remove as usize;
        self.get_mut().splice(start..end, insert.iter().copied());
        self.set_position(offset + insert.len() as u64);
        Ok(())
    }
}

impl ByteStore for File {
    fn byte_len(&mut self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    /// Rewrites the tail of the file in place.
    ///
    /// This is not atomic; callers that need an all-or-nothing update should
    /// stage the edit in a [`MemoryStore`] instead (see
    /// [`JpegFile::write_to`](crate::JpegFile::write_to)).
    fn splice(&mut self, offset: u64, remove: u64, insert: &[u8]) -> Result<()> {
        let len = self.byte_len()?;
        check_range(offset, remove, len)?;

        let mut tail = Vec::with_capacity((len - offset - remove) as usize);
        self.seek(SeekFrom::Start(offset + remove))?;
        self.read_to_end(&mut tail)?;

        self.seek(SeekFrom::Start(offset))?;
        self.write_all(insert)?;
        self.write_all(&tail)?;
        self.set_len(offset + insert.len() as u64 + tail.len() as u64)?;
        self.flush()?;

        self.seek(SeekFrom::Start(offset + insert.len() as u64))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_splice_grow_and_shrink() {
        let mut store = Cursor::new(b"0123456789".to_vec());

        store.splice(2, 3, b"ab").unwrap();
        assert_eq!(store.get_ref(), b"01ab56789");
        assert_eq!(store.position(), 4);

        store.splice(0, 0, b"xyz").unwrap();
        assert_eq!(store.get_ref(), b"xyz01ab56789");

        store.splice(9, 3, b"").unwrap();
        assert_eq!(store.get_ref(), b"xyz01ab56");
        assert_eq!(store.byte_len().unwrap(), 9);
    }

    #[test]
    fn test_memory_splice_out_of_range() {
        let mut store = Cursor::new(vec![0u8; 4]);
        assert!(matches!(
            store.splice(3, 2, b""),
            Err(Error::InvalidSegment { offset: 3, .. })
        ));
        assert!(store.splice(u64::MAX, 2, b"").is_err());
        assert_eq!(store.get_ref().len(), 4);
    }

    #[test]
    fn test_file_splice() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"hello, world").unwrap();

        file.splice(5, 2, b"!!! ").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello!!! world");

        file.splice(0, 9, b"").unwrap();
        assert_eq!(file.byte_len().unwrap(), 5);
    }
}
