//! Payload archive production.
//!
//! The RPM payload is a SVR4 `newc` cpio archive of the collected records,
//! gzip-compressed. The assembler only depends on the [`PayloadArchiver`]
//! trait; [`CpioGzArchiver`] is the built-in implementation.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::collect::{FileKind, FileRecord};
use crate::error::{IoResultExt, PackError};

/// Files produced by a [`PayloadArchiver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Uncompressed archive.
    pub archive: PathBuf,
    /// Compressed archive; this is what goes into the package.
    pub compressed: PathBuf,
}

impl Payload {
    /// Check that both files exist.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::MissingArtifact`] naming the first missing file.
    pub fn verify(&self) -> Result<(), PackError> {
        for path in [&self.archive, &self.compressed] {
            if !path.is_file() {
                return Err(PackError::MissingArtifact { path: path.clone() });
            }
        }
        Ok(())
    }

    /// Size of the uncompressed archive.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] if the file cannot be stat'ed.
    pub fn archive_size(&self) -> Result<u64, PackError> {
        Ok(std::fs::metadata(&self.archive).at(&self.archive)?.len())
    }
}

/// Produces the payload for a set of records.
pub trait PayloadArchiver: Send + Sync {
    /// Archive `records` (relative to `root`) into files under `out_dir`.
    ///
    /// Entries must appear in the order of `records`.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] on any I/O failure.
    fn archive(
        &self,
        root: &Path,
        records: &[FileRecord],
        out_dir: &Path,
    ) -> Result<Payload, PackError>;
}

/// `newc` cpio archive compressed with gzip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpioGzArchiver {
    level: u32,
}

impl CpioGzArchiver {
    /// Archiver with the given gzip level (0-9).
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Default for CpioGzArchiver {
    fn default() -> Self {
        Self::new(9)
    }
}

impl PayloadArchiver for CpioGzArchiver {
    fn archive(
        &self,
        root: &Path,
        records: &[FileRecord],
        out_dir: &Path,
    ) -> Result<Payload, PackError> {
        let archive = out_dir.join("payload.cpio");
        let compressed = out_dir.join("payload.cpio.gz");

        {
            let file = File::create(&archive).at(&archive)?;
            let mut cpio = CpioWriter::new(BufWriter::new(file));
            for record in records {
                let path = root.join(&record.relative_path);
                match record.kind {
                    FileKind::Regular => {
                        let file = File::open(&path).at(&path)?;
                        cpio.append(record, &mut BufReader::new(file)).at(&path)?;
                    }
                    FileKind::Symlink => {
                        let mut body = record.link_target.as_bytes();
                        cpio.append(record, &mut body).at(&path)?;
                    }
                    FileKind::Directory => cpio.append(record, &mut io::empty()).at(&path)?,
                }
            }
            let (mut inner, written) = cpio.finish().at(&archive)?;
            inner.flush().at(&archive)?;
            debug!(bytes = written, entries = records.len(), "wrote cpio payload");
        }

        {
            let mut src = BufReader::new(File::open(&archive).at(&archive)?);
            let out = BufWriter::new(File::create(&compressed).at(&compressed)?);
            let mut encoder = GzEncoder::new(out, Compression::new(self.level));
            io::copy(&mut src, &mut encoder).at(&compressed)?;
            encoder.finish().at(&compressed)?.flush().at(&compressed)?;
        }

        Ok(Payload {
            archive,
            compressed,
        })
    }
}

const NEWC_MAGIC: &str = "070701";
const TRAILER: &str = "TRAILER!!!";

/// Streaming writer for SVR4 `newc` cpio archives.
#[derive(Debug)]
pub struct CpioWriter<W: Write> {
    inner: W,
    written: u64,
}

struct NewcHeader {
    ino: u64,
    mode: u32,
    nlink: u32,
    mtime: i64,
    filesize: u64,
}

impl<W: Write> CpioWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Append one entry named `./<relative_path>`, copying its body from `data`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on sizes beyond the 32-bit `newc` limit, and if
    /// `data` yields a different number of bytes than the record announces.
    pub fn append(&mut self, record: &FileRecord, data: &mut dyn Read) -> io::Result<()> {
        let filesize = match record.kind {
            FileKind::Regular => record.size,
            FileKind::Symlink => record.link_target.len() as u64,
            FileKind::Directory => 0,
        };
        let header = NewcHeader {
            ino: record.inode,
            mode: record.mode,
            nlink: if record.is_directory() { 2 } else { 1 },
            mtime: record.mtime,
            filesize,
        };
        self.write_header(&header, &format!("./{}", record.relative_path))?;

        let copied = io::copy(data, &mut self.inner)?;
        if copied != filesize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} changed while archiving: expected {filesize} bytes, read {copied}",
                    record.relative_path
                ),
            ));
        }
        self.written += copied;
        self.pad()
    }

    /// Write the `TRAILER!!!` entry and return the inner writer with the
    /// total number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying writer.
    pub fn finish(mut self) -> io::Result<(W, u64)> {
        let trailer = NewcHeader {
            ino: 0,
            mode: 0,
            nlink: 1,
            mtime: 0,
            filesize: 0,
        };
        self.write_header(&trailer, TRAILER)?;
        Ok((self.inner, self.written))
    }

    fn write_header(&mut self, h: &NewcHeader, name: &str) -> io::Result<()> {
        let filesize = u32::try_from(h.filesize).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name} exceeds the 4 GiB cpio entry limit"),
            )
        })?;
        let mtime = u32::try_from(h.mtime.max(0)).unwrap_or(u32::MAX);

        let header = format!(
            "{NEWC_MAGIC}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}",
            h.ino as u32,
            h.mode,
            0, // uid
            0, // gid
            h.nlink,
            mtime,
            filesize,
            0, // dev major
            0, // dev minor
            0, // rdev major
            0, // rdev minor
            name.len() + 1,
            0, // check
        );
        self.inner.write_all(header.as_bytes())?;
        self.inner.write_all(name.as_bytes())?;
        self.inner.write_all(&[0])?;
        self.written += (header.len() + name.len() + 1) as u64;
        self.pad()
    }

    fn pad(&mut self) -> io::Result<()> {
        let padding = (4 - self.written % 4) % 4;
        if padding > 0 {
            self.inner.write_all(&[0u8; 3][..padding as usize])?;
            self.written += padding;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::collect_file_records;
    use crate::context::Ownership;

    fn record(path: &str, kind: FileKind, size: u64) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            kind,
            owner: "root".into(),
            group: "root".into(),
            size,
            mode: 0o100_644,
            inode: 7,
            device: 0,
            mtime: 1_700_000_000,
            digest: String::new(),
            link_target: String::new(),
            lang: String::new(),
        }
    }

    #[test]
    fn newc_entry_layout() {
        let mut cpio = CpioWriter::new(Vec::new());
        cpio.append(&record("a", FileKind::Regular, 3), &mut &b"xyz"[..])
            .unwrap();
        let (bytes, written) = cpio.finish().unwrap();

        assert_eq!(written as usize, bytes.len());
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(&bytes[..6], b"070701");
        // header (110) + "./a\0" (4) = 114, padded to 116, then the body
        assert_eq!(&bytes[110..114], b"./a\0");
        assert_eq!(&bytes[116..119], b"xyz");
        // namesize field covers the terminating NUL
        assert_eq!(&bytes[94..102], b"00000004");

        let tail = String::from_utf8_lossy(&bytes[120..]);
        assert!(tail.contains(TRAILER));
    }

    #[test]
    fn short_read_is_an_error() {
        let mut cpio = CpioWriter::new(Vec::new());
        let err = cpio
            .append(&record("a", FileKind::Regular, 10), &mut &b"xyz"[..])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn archiver_produces_both_files() {
        let bundle = tempfile::tempdir().unwrap();
        std::fs::write(bundle.path().join("app.lua"), "print(1)\n").unwrap();
        std::fs::create_dir(bundle.path().join("conf")).unwrap();
        std::fs::write(bundle.path().join("conf/init.lua"), "return {}\n").unwrap();
        let records = collect_file_records(bundle.path(), &Ownership::default()).unwrap();

        let out = tempfile::tempdir().unwrap();
        let payload = CpioGzArchiver::default()
            .archive(bundle.path(), &records, out.path())
            .unwrap();
        payload.verify().unwrap();

        let raw = std::fs::read(&payload.archive).unwrap();
        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(File::open(&payload.compressed).unwrap())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(raw, decoded);
        assert_eq!(payload.archive_size().unwrap(), raw.len() as u64);

        let text = String::from_utf8_lossy(&raw);
        let app = text.find("./app.lua").unwrap();
        let conf = text.find("./conf\0").unwrap();
        let init = text.find("./conf/init.lua").unwrap();
        assert!(app < conf && conf < init);
    }

    #[test]
    fn verify_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let payload = Payload {
            archive: dir.path().join("a.cpio"),
            compressed: dir.path().join("a.cpio.gz"),
        };
        assert!(matches!(
            payload.verify(),
            Err(PackError::MissingArtifact { .. })
        ));
    }
}
