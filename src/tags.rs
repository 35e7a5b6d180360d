//! Metadata tags attached to a JPEG file

use crate::error::Result;
use crate::tiff::{self, Endian, ExifInfo, Ifd, Value};
use crate::xmp::XmpTag;

/// The kinds of tag a JPEG file can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    /// Exif tag tree in APP1
    Exif,
    /// XMP packet in APP1
    Xmp,
    /// Text in a COM segment
    Comment,
}

impl TagKind {
    /// All kinds, in the order a save writes them
    pub const ALL: [TagKind; 3] = [TagKind::Exif, TagKind::Xmp, TagKind::Comment];

    /// Get a string representation of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exif => "exif",
            Self::Xmp => "xmp",
            Self::Comment => "comment",
        }
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exif metadata as a TIFF tag tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifTag {
    /// IFD0 and its sub-IFDs
    pub root: Ifd,
    /// Directories chained after IFD0 (IFD1 holds the thumbnail)
    pub chain: Vec<Ifd>,
}

impl ExifTag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the TIFF body of an Exif segment
    pub fn decode(data: &[u8], endian: Endian, ifd_offset: u32) -> Result<Self> {
        let mut ifds = tiff::decode(data, endian, ifd_offset)?.into_iter();
        Ok(Self {
            root: ifds.next().unwrap_or_default(),
            chain: ifds.collect(),
        })
    }

    /// Encode the tree for a body whose first IFD sits at `first_ifd_offset`
    pub fn encode(&self, first_ifd_offset: u32) -> Result<Vec<u8>> {
        tiff::encode(std::iter::once(&self.root).chain(&self.chain), first_ifd_offset)
    }

    /// Value of an IFD0 entry
    pub fn get(&self, tag: u16) -> Option<&Value> {
        self.root.entries.get(&tag)
    }

    /// Set an IFD0 entry, returning the previous value
    pub fn set(&mut self, tag: u16, value: Value) -> Option<Value> {
        self.root.entries.insert(tag, value)
    }

    pub fn remove(&mut self, tag: u16) -> Option<Value> {
        self.root.entries.remove(&tag)
    }

    /// The Exif sub-IFD, created if missing
    pub fn exif_ifd_mut(&mut self) -> &mut Ifd {
        self.root
            .sub_ifds
            .entry(tiff::tags::EXIF_IFD_POINTER)
            .or_default()
    }

    /// Summary of the common descriptive fields
    pub fn info(&self) -> ExifInfo {
        ExifInfo::from_ifd(&self.root)
    }
}

/// Text from a COM segment
///
/// Stored on disk as single-byte (Latin-1) characters followed by a NUL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentTag {
    pub value: String,
}

impl CommentTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Decode single-byte text, without the trailing NUL
    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            value: bytes.iter().map(|&b| b as char).collect(),
        }
    }

    /// Encode as single-byte text plus NUL; unrepresentable characters become '?'
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self
            .value
            .chars()
            .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
            .collect();
        bytes.push(0);
        bytes
    }
}

/// A single tag of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Exif(ExifTag),
    Xmp(XmpTag),
    Comment(CommentTag),
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::Exif(_) => TagKind::Exif,
            Tag::Xmp(_) => TagKind::Xmp,
            Tag::Comment(_) => TagKind::Comment,
        }
    }
}

/// Borrowed view of a tag in an [`ImageTagSet`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagRef<'a> {
    Exif(&'a ExifTag),
    Xmp(&'a XmpTag),
    Comment(&'a CommentTag),
}

/// At most one Exif, one XMP and one comment tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageTagSet {
    exif: Option<ExifTag>,
    xmp: Option<XmpTag>,
    comment: Option<CommentTag>,
}

impl ImageTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a tag by kind
    pub fn get(&self, kind: TagKind) -> Option<TagRef<'_>> {
        match kind {
            TagKind::Exif => self.exif.as_ref().map(TagRef::Exif),
            TagKind::Xmp => self.xmp.as_ref().map(TagRef::Xmp),
            TagKind::Comment => self.comment.as_ref().map(TagRef::Comment),
        }
    }

    pub fn contains(&self, kind: TagKind) -> bool {
        self.get(kind).is_some()
    }

    /// Create an empty tag of `kind` unless one is already present
    pub fn add(&mut self, kind: TagKind) {
        match kind {
            TagKind::Exif => {
                self.exif.get_or_insert_with(ExifTag::new);
            }
            TagKind::Xmp => {
                self.xmp.get_or_insert_with(XmpTag::new);
            }
            TagKind::Comment => {
                self.comment.get_or_insert_with(CommentTag::default);
            }
        }
    }

    /// Store a tag, returning the one it replaces
    pub fn insert(&mut self, tag: Tag) -> Option<Tag> {
        match tag {
            Tag::Exif(t) => self.exif.replace(t).map(Tag::Exif),
            Tag::Xmp(t) => self.xmp.replace(t).map(Tag::Xmp),
            Tag::Comment(t) => self.comment.replace(t).map(Tag::Comment),
        }
    }

    pub fn remove(&mut self, kind: TagKind) -> Option<Tag> {
        match kind {
            TagKind::Exif => self.exif.take().map(Tag::Exif),
            TagKind::Xmp => self.xmp.take().map(Tag::Xmp),
            TagKind::Comment => self.comment.take().map(Tag::Comment),
        }
    }

    /// Kinds currently present, in save order
    pub fn kinds(&self) -> Vec<TagKind> {
        TagKind::ALL
            .into_iter()
            .filter(|&kind| self.contains(kind))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.xmp.is_none() && self.comment.is_none()
    }

    pub fn exif(&self) -> Option<&ExifTag> {
        self.exif.as_ref()
    }

    pub fn exif_mut(&mut self) -> Option<&mut ExifTag> {
        self.exif.as_mut()
    }

    pub fn xmp(&self) -> Option<&XmpTag> {
        self.xmp.as_ref()
    }

    pub fn xmp_mut(&mut self) -> Option<&mut XmpTag> {
        self.xmp.as_mut()
    }

    pub fn comment(&self) -> Option<&CommentTag> {
        self.comment.as_ref()
    }

    pub fn comment_mut(&mut self) -> Option<&mut CommentTag> {
        self.comment.as_mut()
    }
}
