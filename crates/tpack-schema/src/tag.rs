//! Typed header entries.
//!
//! A [`Tag`] pairs a numeric id with a [`TagValue`]. The value enum carries
//! its own shape, so the common constructors derive the declared
//! [`TagType`] from it. [`Tag::typed`] exists for the rare case where the
//! declared type must be stated explicitly; the codec rejects any mismatch.

/// On-disk type code of a header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    /// No data.
    Null,
    /// Single bytes.
    Char,
    /// 8-bit integers.
    Int8,
    /// 16-bit big-endian integers.
    Int16,
    /// 32-bit big-endian integers.
    Int32,
    /// 64-bit big-endian integers.
    Int64,
    /// One zero-terminated string.
    String,
    /// Opaque bytes.
    Bin,
    /// Zero-terminated strings, concatenated.
    StringArray,
}

impl TagType {
    /// Numeric code written into the index entry.
    pub fn code(self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Char => 1,
            Self::Int8 => 2,
            Self::Int16 => 3,
            Self::Int32 => 4,
            Self::Int64 => 5,
            Self::String => 6,
            Self::Bin => 7,
            Self::StringArray => 8,
        }
    }

    /// Inverse of [`code`](Self::code). Returns `None` for codes this
    /// crate does not produce (e.g. `I18NSTRING`).
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Null,
            1 => Self::Char,
            2 => Self::Int8,
            3 => Self::Int16,
            4 => Self::Int32,
            5 => Self::Int64,
            6 => Self::String,
            7 => Self::Bin,
            8 => Self::StringArray,
            _ => return None,
        })
    }

    /// Natural alignment of the encoded data, in bytes.
    pub fn alignment(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int32 => 4,
            Self::Int64 => 8,
            _ => 1,
        }
    }
}

impl std::fmt::Display for TagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Char => "char",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::String => "string",
            Self::Bin => "bin",
            Self::StringArray => "string array",
        };
        f.write_str(name)
    }
}

/// Value of a header entry. The variant determines the encoded shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// Empty value.
    Null,
    /// Raw characters.
    Char(Vec<u8>),
    /// Raw bytes.
    Bin(Vec<u8>),
    /// A single string.
    Str(String),
    /// An ordered list of strings.
    StrArray(Vec<String>),
    /// 8-bit integer array.
    I8(Vec<i8>),
    /// 16-bit integer array.
    I16(Vec<i16>),
    /// 32-bit integer array.
    I32(Vec<i32>),
    /// 64-bit integer array.
    I64(Vec<i64>),
}

impl TagValue {
    /// The tag type this value encodes as.
    pub fn tag_type(&self) -> TagType {
        match self {
            Self::Null => TagType::Null,
            Self::Char(_) => TagType::Char,
            Self::Bin(_) => TagType::Bin,
            Self::Str(_) => TagType::String,
            Self::StrArray(_) => TagType::StringArray,
            Self::I8(_) => TagType::Int8,
            Self::I16(_) => TagType::Int16,
            Self::I32(_) => TagType::Int32,
            Self::I64(_) => TagType::Int64,
        }
    }
}

/// One header entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Numeric tag id (e.g. 1000 for the package name).
    pub id: u32,
    /// Declared on-disk type.
    pub kind: TagType,
    /// Payload.
    pub value: TagValue,
}

impl Tag {
    /// Create a tag whose type is taken from the value.
    pub fn new(id: u32, value: TagValue) -> Self {
        Self {
            id,
            kind: value.tag_type(),
            value,
        }
    }

    /// Create a tag with an explicitly declared type.
    ///
    /// The pairing is checked when the tag is encoded, not here.
    pub fn typed(id: u32, kind: TagType, value: TagValue) -> Self {
        Self { id, kind, value }
    }

    /// `String` tag.
    pub fn string(id: u32, value: impl Into<String>) -> Self {
        Self::new(id, TagValue::Str(value.into()))
    }

    /// `StringArray` tag.
    pub fn string_array<I, S>(id: u32, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            id,
            TagValue::StrArray(values.into_iter().map(Into::into).collect()),
        )
    }

    /// `Bin` tag.
    pub fn bin(id: u32, value: impl Into<Vec<u8>>) -> Self {
        Self::new(id, TagValue::Bin(value.into()))
    }

    /// `Int16` tag.
    pub fn int16(id: u32, values: impl Into<Vec<i16>>) -> Self {
        Self::new(id, TagValue::I16(values.into()))
    }

    /// `Int32` tag.
    pub fn int32(id: u32, values: impl Into<Vec<i32>>) -> Self {
        Self::new(id, TagValue::I32(values.into()))
    }

    /// `Int64` tag.
    pub fn int64(id: u32, values: impl Into<Vec<i64>>) -> Self {
        Self::new(id, TagValue::I64(values.into()))
    }
}

/// Ordered collection of tags. Insertion order is the on-disk index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl TagSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag.
    pub fn push(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    /// Number of tags (the implicit region tag is not counted).
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the set holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    /// Find the first tag with the given id.
    pub fn get(&self, id: u32) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

impl Extend<Tag> for TagSet {
    fn extend<I: IntoIterator<Item = Tag>>(&mut self, iter: I) {
        self.tags.extend(iter);
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// Encoded payload of a single tag plus the element count for its index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedTag {
    /// Element count (strings, integers or bytes depending on type).
    pub count: u32,
    /// Encoded bytes, without alignment padding.
    pub data: Vec<u8>,
}
