//! Bookkeeping for where metadata lives in a JPEG file
//!
//! Metadata segments that directly follow SOI form one contiguous block which
//! a save overwrites wholesale. Metadata found after the first structural
//! segment is "scattered": a save has to delete it individually.

use crate::segment::SegmentClass;
use crate::tags::TagKind;

/// Offset of the metadata block (right after SOI)
pub const BLOCK_START: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRegion {
    /// Length of the contiguous block at [`BLOCK_START`]
    length: u64,
    growing: bool,
    exif: u64,
    xmp: u64,
    comment: u64,
}

impl Default for MetadataRegion {
    fn default() -> Self {
        Self {
            length: 0,
            growing: true,
            exif: 0,
            xmp: 0,
            comment: 0,
        }
    }
}

impl MetadataRegion {
    /// Length of the metadata block in bytes
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Offset one past the end of the metadata block
    pub fn end(&self) -> u64 {
        BLOCK_START + self.length
    }

    /// True until the first structural segment is seen
    pub fn is_growing(&self) -> bool {
        self.growing
    }

    /// Account for a classified segment with the given size field
    pub fn record(&mut self, size: u16, class: SegmentClass) {
        if !self.growing {
            return;
        }
        match class {
            SegmentClass::Metadata => self.length += 2 + size as u64,
            SegmentClass::Other => self.growing = false,
        }
    }

    /// Remember where a tag's segment sits, if it lies outside the block
    pub fn mark(&mut self, kind: TagKind, marker_offset: u64) {
        if self.growing {
            return;
        }
        *self.slot(kind) = marker_offset;
    }

    /// Scattered position of a tag, or 0 when it is part of the block
    pub fn position(&self, kind: TagKind) -> u64 {
        match kind {
            TagKind::Exif => self.exif,
            TagKind::Xmp => self.xmp,
            TagKind::Comment => self.comment,
        }
    }

    /// Non-zero scattered positions, latest first
    pub fn scattered_descending(&self) -> Vec<u64> {
        let mut positions: Vec<u64> = TagKind::ALL
            .into_iter()
            .map(|kind| self.position(kind))
            .filter(|&pos| pos != 0)
            .collect();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        positions
    }

    pub fn clear_scattered(&mut self) {
        for kind in TagKind::ALL {
            *self.slot(kind) = 0;
        }
    }

    /// The block was replaced by one of `length` bytes
    pub fn set_length(&mut self, length: u64) {
        self.length = length;
    }

    fn slot(&mut self, kind: TagKind) -> &mut u64 {
        match kind {
            TagKind::Exif => &mut self.exif,
            TagKind::Xmp => &mut self.xmp,
            TagKind::Comment => &mut self.comment,
        }
    }
}
