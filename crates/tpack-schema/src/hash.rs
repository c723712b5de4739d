//! Digest newtypes.

use std::io::Read;

use sha1::Digest as _;

/// Hex-encoded MD5 digest (32 hex characters).
///
/// Used for per-file digests in package headers. MD5 is what the header
/// format expects here, not a security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Md5Hex(String);

impl Md5Hex {
    /// Compute the digest of in-memory data.
    pub fn compute(data: &[u8]) -> Self {
        Self(format!("{:x}", md5::compute(data)))
    }

    /// Compute the digest of a file, streaming it in 64 KiB chunks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or read.
    pub fn compute_file(path: &std::path::Path) -> std::io::Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut ctx = md5::Context::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            ctx.consume(&buf[..n]);
        }
        Ok(Self(format!("{:x}", ctx.finalize())))
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Md5Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Md5Hex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hex-encoded SHA-1 digest (40 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha1Hex(String);

impl Sha1Hex {
    /// Compute the digest of in-memory data.
    pub fn compute(data: &[u8]) -> Self {
        Self(hex::encode(sha1::Sha1::digest(data)))
    }

    /// Wrap an already computed digest.
    pub fn from_bytes(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sha1Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha1Hex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_known_vector() {
        assert_eq!(
            Md5Hex::compute(b"hello world").as_str(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn md5_file_matches_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        let data = vec![7u8; 200_000];
        std::fs::write(&path, &data).unwrap();
        assert_eq!(Md5Hex::compute_file(&path).unwrap(), Md5Hex::compute(&data));
    }

    #[test]
    fn sha1_known_vector() {
        assert_eq!(
            Sha1Hex::compute(b"abc").as_str(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }
}
