//! Tarball and `ar` writers shared by the DEB and TGZ builders.

use std::io::{self, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{EntryType, Header, HeaderMode};

use crate::error::{IoResultExt, PackError};

/// Gzip-compressed tarball with reproducible headers.
///
/// Entries are named by their path relative to the tree root and symlinks
/// are stored as links.
pub struct TarGz<W: Write> {
    builder: tar::Builder<GzEncoder<W>>,
}

impl<W: Write> TarGz<W> {
    /// Start a tarball compressed at `level` (0-9).
    pub fn new(inner: W, level: u32) -> Self {
        let mut builder = tar::Builder::new(GzEncoder::new(inner, Compression::new(level.min(9))));
        builder.mode(HeaderMode::Deterministic);
        builder.follow_symlinks(false);
        Self { builder }
    }

    /// Append everything below `root`, in file-name order at every level.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] naming the entry that failed.
    pub fn append_tree(&mut self, root: &Path) -> Result<(), PackError> {
        let walker = walkdir::WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                PackError::io(path, e.into())
            })?;
            let path = entry.path();
            let rel = path
                .strip_prefix(root)
                .map_err(|_| PackError::Invalid(format!("{} escapes the bundle", path.display())))?;
            self.builder.append_path_with_name(path, rel).at(path)?;
        }
        Ok(())
    }

    /// Append an in-memory regular file.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying writer.
    pub fn append_bytes(&mut self, name: &str, mode: u32, data: &[u8]) -> io::Result<()> {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(mode);
        header.set_size(data.len() as u64);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_cksum();
        self.builder.append_data(&mut header, name, data)
    }

    /// Finish the tarball and the gzip stream, returning the inner writer.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        self.builder.into_inner()?.finish()
    }
}

const AR_MAGIC: &[u8] = b"!<arch>\n";

/// Writer for the common `ar` format used by `.deb` packages.
pub struct ArWriter<W: Write> {
    inner: W,
    mtime: i64,
}

impl<W: Write> ArWriter<W> {
    /// Write the global header. Every member gets `mtime`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying writer.
    pub fn new(mut inner: W, mtime: i64) -> io::Result<Self> {
        inner.write_all(AR_MAGIC)?;
        Ok(Self { inner, mtime })
    }

    /// Append one member owned by root with mode 0644.
    ///
    /// # Errors
    ///
    /// Fails if `name` does not fit the 16-byte name field, or on I/O errors.
    pub fn append(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        if name.len() > 16 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("ar member name {name:?} is longer than 16 bytes"),
            ));
        }
        let header = format!(
            "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
            name,
            self.mtime.max(0),
            0,
            0,
            "100644",
            data.len()
        );
        self.inner.write_all(header.as_bytes())?;
        self.inner.write_all(data)?;
        if data.len() % 2 == 1 {
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Return the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn ar_member_layout() {
        let mut ar = ArWriter::new(Vec::new(), 1_700_000_000).unwrap();
        ar.append("debian-binary", b"2.0\n").unwrap();
        ar.append("odd", b"abc").unwrap();
        let bytes = ar.into_inner();

        assert_eq!(&bytes[..8], AR_MAGIC);
        let first = &bytes[8..68];
        assert_eq!(&first[..16], b"debian-binary   ");
        assert_eq!(&first[16..26], b"1700000000");
        assert_eq!(&first[48..52], b"4   ");
        assert_eq!(&first[58..60], b"`\n");
        assert_eq!(&bytes[68..72], b"2.0\n");
        // odd-sized member is padded with a newline
        assert_eq!(bytes.len(), 72 + 60 + 4);
        assert_eq!(bytes.last(), Some(&b'\n'));
    }

    #[test]
    fn ar_rejects_long_names() {
        let mut ar = ArWriter::new(Vec::new(), 0).unwrap();
        assert!(ar.append("a-very-long-member-name", b"").is_err());
    }

    #[test]
    fn tarball_is_sorted_and_keeps_symlinks() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("b.lua"), "b").unwrap();
        std::fs::create_dir(root.path().join("a")).unwrap();
        std::fs::write(root.path().join("a/x.lua"), "x").unwrap();
        std::os::unix::fs::symlink("b.lua", root.path().join("c")).unwrap();

        let mut tgz = TarGz::new(Vec::new(), 6);
        tgz.append_tree(root.path()).unwrap();
        tgz.append_bytes("extra", 0o755, b"#!/bin/sh\n").unwrap();
        let bytes = tgz.finish().unwrap();

        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(&bytes[..]));
        let mut names = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            if name == "c" {
                assert_eq!(entry.header().entry_type(), EntryType::Symlink);
                assert_eq!(
                    entry.link_name().unwrap().unwrap().to_string_lossy(),
                    "b.lua"
                );
            }
            if name == "extra" {
                assert_eq!(entry.header().mode().unwrap(), 0o755);
                let mut body = String::new();
                entry.read_to_string(&mut body).unwrap();
                assert_eq!(body, "#!/bin/sh\n");
            }
            names.push(name.trim_end_matches('/').to_string());
        }
        assert_eq!(names, vec!["a", "a/x.lua", "b.lua", "c", "extra"]);
    }
}
