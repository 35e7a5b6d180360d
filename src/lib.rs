//! Read and rewrite metadata tags in JPEG files.
//!
//! This crate finds the Exif, XMP and comment segments of a JPEG stream,
//! decodes them into typed tags, and writes edited tags back without touching
//! the compressed image data. It also reports the frame size and an estimate
//! of the encoder quality derived from the quantization tables.
//!
//! # Design Principles
//!
//! - **Header-only reads**: scanning stops at the first SOS marker
//! - **One metadata block**: a save gathers all tags right after SOI
//! - **Fail before writing**: every segment is rendered and size-checked
//!   before the first byte of the file changes
//!
//! # Quick Start
//!
//! ```no_run
//! use jpeg_tag_io::{JpegFile, TagKind};
//!
//! # fn main() -> jpeg_tag_io::Result<()> {
//! let mut file = JpegFile::open("image.jpg")?;
//!
//! if let Some(exif) = file.tags().exif() {
//!     println!("{}", exif.info());
//! }
//!
//! file.tags_mut().add(TagKind::Xmp);
//! if let Some(xmp) = file.tags_mut().xmp_mut() {
//!     xmp.set("dc:title", "Harbor at dusk")?;
//! }
//! file.tags_mut().remove(TagKind::Comment);
//!
//! file.write_to("image.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Working with any store
//!
//! [`JpegFile`] is generic over [`ByteStore`], which is implemented for
//! in-memory cursors and for [`std::fs::File`]. Saving to a `File` edits it
//! in place:
//!
//! ```no_run
//! use jpeg_tag_io::{JpegFile, ReadStyle};
//! use std::fs::OpenOptions;
//!
//! # fn main() -> jpeg_tag_io::Result<()> {
//! let file = OpenOptions::new().read(true).write(true).open("image.jpg")?;
//! let mut jpeg = JpegFile::read_with_style(file, ReadStyle::None)?;
//! jpeg.tags_mut().remove(jpeg_tag_io::TagKind::Exif);
//! jpeg.save()?;
//! # Ok(())
//! # }
//! ```

mod error;
mod formats;
mod properties;
pub mod quality;
mod segment;
mod store;
mod tags;
pub mod tiff;
pub mod xmp;

pub use error::{Error, Result};
pub use formats::{JpegFile, MetadataRegion, BLOCK_START, DEFAULT_JFIF_HEADER};
pub use properties::{Properties, ReadStyle};
pub use quality::{estimate_quality, estimate_tables, TableEstimate};
pub use segment::{
    is_sof, marker_label, ByteRange, Segment, SegmentClass, APP0, APP1, COM, DQT, EOI,
    MARKER_PREFIX, MAX_SEGMENT_SIZE, SOI, SOS,
};
pub use store::{ByteStore, MemoryStore};
pub use tags::{CommentTag, ExifTag, ImageTagSet, Tag, TagKind, TagRef};
pub use tiff::ExifInfo;
pub use xmp::XmpTag;

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
