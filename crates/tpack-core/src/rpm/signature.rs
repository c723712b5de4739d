//! Signature section: digests and sizes over the header and payload.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha1::{Digest, Sha1};
use tpack_schema::{Sha1Hex, Tag, TagSet, encode};

use super::tags;
use crate::error::{IoResultExt, PackError};

const CHUNK: usize = 64 * 1024;

/// Values carried by the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// SHA-1 of the encoded metadata header, lowercase hex.
    pub header_sha1: Sha1Hex,
    /// Length of header plus compressed payload.
    pub size: u64,
    /// Length of the uncompressed payload archive.
    pub payload_size: u64,
    /// MD5 of header plus compressed payload.
    pub md5: [u8; 16],
}

impl Signature {
    /// Compute the signature from `path`, which holds the encoded header
    /// (its first `header_len` bytes) followed by the compressed payload.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] if the file cannot be read or is shorter
    /// than `header_len`.
    pub fn compute(path: &Path, header_len: usize, payload_size: u64) -> Result<Self, PackError> {
        let mut reader = BufReader::new(File::open(path).at(path)?);
        let mut md5 = md5::Context::new();
        let mut sha1 = Sha1::new();
        let mut buf = vec![0u8; CHUNK];
        let mut size = 0u64;
        let mut header_left = header_len;

        loop {
            let n = reader.read(&mut buf).at(path)?;
            if n == 0 {
                break;
            }
            let chunk = &buf[..n];
            md5.consume(chunk);
            let in_header = header_left.min(n);
            sha1.update(&chunk[..in_header]);
            header_left -= in_header;
            size += n as u64;
        }

        if header_left > 0 {
            return Err(PackError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "file is shorter than the encoded header",
                ),
            ));
        }

        Ok(Self {
            header_sha1: Sha1Hex::from_bytes(&sha1.finalize()),
            size,
            payload_size,
            md5: md5.finalize().0,
        })
    }

    /// Tags in ascending id order. Sizes beyond `i32::MAX` switch to the
    /// 64-bit variants.
    pub fn to_tag_set(&self) -> TagSet {
        let mut set = TagSet::new();
        set.push(Tag::string(tags::SIG_SHA1, self.header_sha1.as_str()));

        let size = i32::try_from(self.size).ok();
        let payload_size = i32::try_from(self.payload_size).ok();
        if size.is_none() {
            set.push(Tag::int64(tags::SIG_LONGSIZE, [self.size as i64]));
        }
        if payload_size.is_none() {
            set.push(Tag::int64(
                tags::SIG_LONGARCHIVESIZE,
                [self.payload_size as i64],
            ));
        }
        if let Some(size) = size {
            set.push(Tag::int32(tags::SIG_SIZE, [size]));
        }
        set.push(Tag::bin(tags::SIG_MD5, self.md5.to_vec()));
        if let Some(payload_size) = payload_size {
            set.push(Tag::int32(tags::SIG_PAYLOADSIZE, [payload_size]));
        }
        set
    }

    /// Encode the signature header, zero-padded to a multiple of 8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Encoding`] if a tag cannot be encoded.
    pub fn encode(&self) -> Result<Vec<u8>, PackError> {
        let mut bytes = encode(&self.to_tag_set(), tags::HEADER_SIGNATURES)?;
        let padded = bytes.len().div_ceil(8) * 8;
        bytes.resize(padded, 0);
        Ok(bytes)
    }
}
