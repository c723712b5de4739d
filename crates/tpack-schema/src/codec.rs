//! Binary codec for header tag sets.
//!
//! Layout produced by [`encode`]:
//!
//! ```text
//! +--------------------------------------------------------------+
//! | magic 8e ad e8 | version 01 | reserved[4] | count | data len |  16 bytes
//! +--------------------------------------------------------------+
//! | region index entry | index entry 1 | ... | index entry N      |  16 bytes each
//! +--------------------------------------------------------------+
//! | tag 1 data | (pad) tag 2 data | ... | region trailer (16)     |
//! +--------------------------------------------------------------+
//! ```
//!
//! Every integer is big-endian. Integer arrays start on their natural
//! alignment inside the data section. The region trailer repeats the region
//! tag's id and type with a negative offset, `-(N + 1) * 16`, which lets a
//! reader find how many index entries the region covers.

use thiserror::Error;

use crate::tag::{PackedTag, Tag, TagSet, TagType, TagValue};

/// Header magic (`8e ad e8`).
pub const HEADER_MAGIC: [u8; 3] = [0x8e, 0xad, 0xe8];

/// Header structure version.
pub const HEADER_VERSION: u8 = 1;

/// Size of the fixed intro and of every index entry.
pub const ENTRY_SIZE: usize = 16;

/// Errors raised while encoding (or reading back) a tag set.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    /// The value's shape does not match the declared type.
    #[error("tag {id}: declared as {expected} but value is {found}")]
    TypeMismatch {
        /// Offending tag id.
        id: u32,
        /// Declared type.
        expected: TagType,
        /// Shape of the supplied value.
        found: TagType,
    },

    /// A type code outside the supported set.
    #[error("tag {id}: unknown type code {code}")]
    UnknownType {
        /// Offending tag id.
        id: u32,
        /// Raw type code.
        code: u32,
    },

    /// A string contains a NUL byte and cannot be zero-terminated.
    #[error("tag {id}: string value contains a NUL byte")]
    InteriorNul {
        /// Offending tag id.
        id: u32,
    },

    /// The tag or the whole data section exceeds the 32-bit limits of the format.
    #[error("tag {id}: encoded data exceeds the format's 32-bit limits")]
    TooLarge {
        /// Offending tag id.
        id: u32,
    },

    /// Input handed to [`read_index`] is not a well-formed header.
    #[error("malformed header: {0}")]
    Malformed(String),
}

/// One 16-byte index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Tag id.
    pub id: u32,
    /// Raw type code.
    pub kind: u32,
    /// Offset into the data section (negative only in the region trailer).
    pub offset: i32,
    /// Element count.
    pub count: u32,
}

impl IndexEntry {
    /// Serialize to the on-disk big-endian form.
    pub fn to_bytes(self) -> [u8; ENTRY_SIZE] {
        let mut out = [0u8; ENTRY_SIZE];
        out[0..4].copy_from_slice(&self.id.to_be_bytes());
        out[4..8].copy_from_slice(&self.kind.to_be_bytes());
        out[8..12].copy_from_slice(&self.offset.to_be_bytes());
        out[12..16].copy_from_slice(&self.count.to_be_bytes());
        out
    }

    /// Parse from the on-disk form.
    pub fn from_bytes(bytes: &[u8; ENTRY_SIZE]) -> Self {
        let word = |i: usize| [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
        Self {
            id: u32::from_be_bytes(word(0)),
            kind: u32::from_be_bytes(word(4)),
            offset: i32::from_be_bytes(word(8)),
            count: u32::from_be_bytes(word(12)),
        }
    }
}

/// Encode a single tag's value.
///
/// # Errors
///
/// Returns [`EncodingError::TypeMismatch`] if the declared type and the
/// value disagree, [`EncodingError::InteriorNul`] for strings that contain
/// NUL, and [`EncodingError::TooLarge`] if the element count overflows.
pub fn pack_tag(tag: &Tag) -> Result<PackedTag, EncodingError> {
    let found = tag.value.tag_type();
    if tag.kind != found {
        return Err(EncodingError::TypeMismatch {
            id: tag.id,
            expected: tag.kind,
            found,
        });
    }

    let count = |len: usize| u32::try_from(len).map_err(|_| EncodingError::TooLarge { id: tag.id });

    let packed = match &tag.value {
        TagValue::Null => PackedTag {
            count: 1,
            data: Vec::new(),
        },
        TagValue::Char(bytes) | TagValue::Bin(bytes) => PackedTag {
            count: count(bytes.len())?,
            data: bytes.clone(),
        },
        TagValue::Str(s) => {
            let mut data = Vec::with_capacity(s.len() + 1);
            push_cstr(&mut data, s, tag.id)?;
            PackedTag { count: 1, data }
        }
        TagValue::StrArray(items) => {
            let mut data = Vec::new();
            for s in items {
                push_cstr(&mut data, s, tag.id)?;
            }
            PackedTag {
                count: count(items.len())?,
                data,
            }
        }
        TagValue::I8(values) => PackedTag {
            count: count(values.len())?,
            data: values.iter().flat_map(|v| v.to_be_bytes()).collect(),
        },
        TagValue::I16(values) => PackedTag {
            count: count(values.len())?,
            data: values.iter().flat_map(|v| v.to_be_bytes()).collect(),
        },
        TagValue::I32(values) => PackedTag {
            count: count(values.len())?,
            data: values.iter().flat_map(|v| v.to_be_bytes()).collect(),
        },
        TagValue::I64(values) => PackedTag {
            count: count(values.len())?,
            data: values.iter().flat_map(|v| v.to_be_bytes()).collect(),
        },
    };

    Ok(packed)
}

fn push_cstr(buf: &mut Vec<u8>, s: &str, id: u32) -> Result<(), EncodingError> {
    if s.as_bytes().contains(&0) {
        return Err(EncodingError::InteriorNul { id });
    }
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    Ok(())
}

/// Encode a tag set into a header blob, appending the region tag `region_tag`.
///
/// The output is a pure function of the input: encoding the same set twice
/// yields identical bytes.
///
/// # Errors
///
/// Returns the first [`EncodingError`] hit by any tag; no partial buffer is
/// produced.
pub fn encode(tags: &TagSet, region_tag: u32) -> Result<Vec<u8>, EncodingError> {
    let mut index: Vec<IndexEntry> = Vec::with_capacity(tags.len() + 1);
    let mut data: Vec<u8> = Vec::new();

    for tag in tags {
        let packed = pack_tag(tag)?;

        let align = tag.kind.alignment();
        let padding = (align - data.len() % align) % align;
        data.resize(data.len() + padding, 0);

        let offset = i32::try_from(data.len()).map_err(|_| EncodingError::TooLarge { id: tag.id })?;
        index.push(IndexEntry {
            id: tag.id,
            kind: tag.kind.code(),
            offset,
            count: packed.count,
        });
        data.extend_from_slice(&packed.data);
    }

    let region_count = ENTRY_SIZE as u32;
    let region_offset =
        i32::try_from(data.len()).map_err(|_| EncodingError::TooLarge { id: region_tag })?;
    let trailer_offset = i32::try_from(tags.len() + 1)
        .ok()
        .and_then(|n| n.checked_mul(-(ENTRY_SIZE as i32)))
        .ok_or(EncodingError::TooLarge { id: region_tag })?;

    let region_index = IndexEntry {
        id: region_tag,
        kind: TagType::Bin.code(),
        offset: region_offset,
        count: region_count,
    };
    let region_trailer = IndexEntry {
        offset: trailer_offset,
        ..region_index
    };
    data.extend_from_slice(&region_trailer.to_bytes());

    let entry_count =
        u32::try_from(index.len() + 1).map_err(|_| EncodingError::TooLarge { id: region_tag })?;
    let data_len = u32::try_from(data.len()).map_err(|_| EncodingError::TooLarge { id: region_tag })?;

    let mut out = Vec::with_capacity(ENTRY_SIZE * (index.len() + 2) + data.len());
    out.extend_from_slice(&HEADER_MAGIC);
    out.push(HEADER_VERSION);
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&entry_count.to_be_bytes());
    out.extend_from_slice(&data_len.to_be_bytes());
    out.extend_from_slice(&region_index.to_bytes());
    for entry in &index {
        out.extend_from_slice(&entry.to_bytes());
    }
    out.extend_from_slice(&data);

    Ok(out)
}

/// Index and data section recovered from an encoded header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderIndex {
    /// Index entries in on-disk order (region entry first).
    pub entries: Vec<IndexEntry>,
    /// Raw data section.
    pub data: Vec<u8>,
    /// Total encoded length (intro + index + data), without any outer padding.
    pub len: usize,
}

impl HeaderIndex {
    /// Look up an entry by tag id.
    pub fn entry(&self, id: u32) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Decode a `String` entry.
    pub fn string(&self, id: u32) -> Option<String> {
        let entry = self.entry(id)?;
        let start = usize::try_from(entry.offset).ok()?;
        let tail = self.data.get(start..)?;
        let end = tail.iter().position(|&b| b == 0)?;
        String::from_utf8(tail[..end].to_vec()).ok()
    }

    /// Decode a `StringArray` entry.
    pub fn string_array(&self, id: u32) -> Option<Vec<String>> {
        let entry = self.entry(id)?;
        let mut pos = usize::try_from(entry.offset).ok()?;
        let mut out = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            let tail = self.data.get(pos..)?;
            let end = tail.iter().position(|&b| b == 0)?;
            out.push(String::from_utf8(tail[..end].to_vec()).ok()?);
            pos += end + 1;
        }
        Some(out)
    }

    /// Decode an `Int32` entry.
    pub fn int32(&self, id: u32) -> Option<Vec<i32>> {
        let entry = self.entry(id)?;
        let start = usize::try_from(entry.offset).ok()?;
        let bytes = self.data.get(start..start + entry.count as usize * 4)?;
        Some(
            bytes
                .chunks_exact(4)
                .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    /// Raw bytes of a `Bin` entry.
    pub fn bin(&self, id: u32) -> Option<&[u8]> {
        let entry = self.entry(id)?;
        let start = usize::try_from(entry.offset).ok()?;
        self.data.get(start..start + entry.count as usize)
    }
}

/// Read back the index of an encoded header starting at `bytes[0]`.
///
/// # Errors
///
/// Returns [`EncodingError::Malformed`] if the magic is wrong or the input
/// is shorter than the lengths it declares.
/// Returns [`EncodingError::UnknownType`] if an index entry carries a type
/// code outside the supported set.
pub fn read_index(bytes: &[u8]) -> Result<HeaderIndex, EncodingError> {
    if bytes.len() < ENTRY_SIZE {
        return Err(EncodingError::Malformed("truncated intro".to_string()));
    }
    if bytes[0..3] != HEADER_MAGIC {
        return Err(EncodingError::Malformed(format!(
            "bad magic {:02x}{:02x}{:02x}",
            bytes[0], bytes[1], bytes[2]
        )));
    }

    let count = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let data_len = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    let index_end = ENTRY_SIZE + count * ENTRY_SIZE;
    let total = index_end + data_len;
    if bytes.len() < total {
        return Err(EncodingError::Malformed(format!(
            "declared {total} bytes, got {}",
            bytes.len()
        )));
    }

    let entries: Vec<IndexEntry> = bytes[ENTRY_SIZE..index_end]
        .chunks_exact(ENTRY_SIZE)
        .map(|chunk| {
            let mut raw = [0u8; ENTRY_SIZE];
            raw.copy_from_slice(chunk);
            IndexEntry::from_bytes(&raw)
        })
        .collect();
    if let Some(entry) = entries
        .iter()
        .find(|e| TagType::from_code(e.kind).is_none())
    {
        return Err(EncodingError::UnknownType {
            id: entry.id,
            code: entry.kind,
        });
    }

    Ok(HeaderIndex {
        entries,
        data: bytes[index_end..total].to_vec(),
        len: total,
    })
}
