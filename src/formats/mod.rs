//! JPEG reading and writing
//!
//! [`jpeg_io`] holds the read pass and its per-marker handlers,
//! [`jpeg_writer`] the save path, and [`region`] the bookkeeping shared by
//! both.

pub(crate) mod jpeg_io;
pub(crate) mod jpeg_writer;
pub(crate) mod region;

pub use jpeg_io::JpegFile;
pub use jpeg_writer::DEFAULT_JFIF_HEADER;
pub use region::{MetadataRegion, BLOCK_START};
