//! File metadata collection.
//!
//! Walks a prepared bundle and snapshots every entry into a [`FileRecord`].
//! Records are sorted by relative path; the header and the payload archive
//! both enumerate files in exactly this order.

use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

use tpack_schema::Md5Hex;
use tracing::{debug, warn};

use crate::context::Ownership;
use crate::error::{IoResultExt, PackError};

/// Top-level system directories that exist on every target. They are never
/// recorded as owned by the package, even when present in the bundle.
pub const IMPLICIT_DIRS: &[&str] = &[
    "bin",
    "etc",
    "etc/systemd",
    "etc/systemd/system",
    "etc/tarantool",
    "etc/tarantool/conf.d",
    "lib",
    "lib/systemd",
    "lib/systemd/system",
    "usr",
    "usr/bin",
    "usr/lib",
    "usr/lib/tmpfiles.d",
    "usr/local",
    "usr/local/bin",
    "usr/share",
    "usr/share/tarantool",
    "var",
    "var/lib",
    "var/lib/tarantool",
    "var/log",
    "var/log/tarantool",
    "var/run",
    "var/run/tarantool",
];

/// What kind of filesystem entry a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file; packaged content with a digest.
    Regular,
    /// Directory; no digest.
    Directory,
    /// Symbolic link; carries a relative link target.
    Symlink,
}

/// Metadata of one packaged entry. Immutable once collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the bundle root, `/`-separated, no leading slash.
    pub relative_path: String,
    /// Entry kind.
    pub kind: FileKind,
    /// Owner name.
    pub owner: String,
    /// Group name.
    pub group: String,
    /// Size in bytes (link length for symlinks).
    pub size: u64,
    /// Full `st_mode` including type bits.
    pub mode: u32,
    /// Inode number.
    pub inode: u64,
    /// Device number.
    pub device: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: i64,
    /// Hex MD5 of the contents; empty unless `kind` is [`FileKind::Regular`].
    pub digest: String,
    /// Link target relative to the link's directory; empty unless a symlink.
    pub link_target: String,
    /// Language tag. Always empty.
    pub lang: String,
}

impl FileRecord {
    /// Whether the record is a directory.
    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Absolute directory part on the target, with a trailing slash (`/usr/share/app/`).
    pub fn dirname(&self) -> String {
        match self.relative_path.rsplit_once('/') {
            Some((dir, _)) => format!("/{dir}/"),
            None => "/".to_string(),
        }
    }

    /// Final path component.
    pub fn basename(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map_or(self.relative_path.as_str(), |(_, base)| base)
    }
}

/// Walk `root` and snapshot every entry below it, sorted by relative path.
///
/// # Errors
///
/// Returns [`PackError::Io`] if any entry cannot be read, hashed, or (for
/// symlinks) resolved to an existing target.
/// Returns [`PackError::Invalid`] for a name that is not valid UTF-8.
pub fn collect_file_records(
    root: &Path,
    ownership: &Ownership,
) -> Result<Vec<FileRecord>, PackError> {
    let mut records = Vec::new();

    for entry in walkdir::WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            PackError::io(path, e.into())
        })?;
        let path = entry.path();
        let relative_path = relative_name(root, path)?;
        let meta = path.symlink_metadata().at(path)?;
        let file_type = meta.file_type();

        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            if IMPLICIT_DIRS.contains(&relative_path.as_str()) {
                debug!(path = %relative_path, "skipping implicit system directory");
                continue;
            }
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::Regular
        } else {
            warn!(path = %relative_path, "skipping special file");
            continue;
        };

        let digest = match kind {
            FileKind::Regular => Md5Hex::compute_file(path).at(path)?.to_string(),
            _ => String::new(),
        };
        let link_target = match kind {
            FileKind::Symlink => resolve_link_target(path)?,
            _ => String::new(),
        };
        let size = match kind {
            FileKind::Symlink => link_target.len() as u64,
            _ => meta.len(),
        };

        records.push(FileRecord {
            relative_path,
            kind,
            owner: ownership.owner.clone(),
            group: ownership.group.clone(),
            size,
            mode: meta.mode(),
            inode: meta.ino(),
            device: meta.dev(),
            mtime: meta.mtime(),
            digest,
            link_target,
            lang: String::new(),
        });
    }

    records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    debug!(count = records.len(), root = %root.display(), "collected file records");
    Ok(records)
}

fn relative_name(root: &Path, path: &Path) -> Result<String, PackError> {
    let rel = path.strip_prefix(root).map_err(|_| {
        PackError::Invalid(format!(
            "{} is outside bundle {}",
            path.display(),
            root.display()
        ))
    })?;
    let parts = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            PackError::Invalid(format!("{} is not a UTF-8 path", path.display()))
        })?;
    Ok(parts.join("/"))
}

/// Resolve a symlink to a target path relative to the link's own directory.
///
/// Absolute targets are rewritten relative to the containing directory. The
/// final path component is kept as written, so links to links stay links to
/// links. Resolution never touches the process working directory.
///
/// # Errors
///
/// Returns [`PackError::Io`] if the link cannot be read or its target does
/// not exist.
pub fn resolve_link_target(link: &Path) -> Result<String, PackError> {
    let containing = link
        .parent()
        .ok_or_else(|| PackError::Invalid(format!("{} has no parent", link.display())))?;
    let raw = std::fs::read_link(link).at(link)?;
    let joined = containing.join(&raw);

    if !joined.exists() {
        return Err(PackError::io(
            link,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dangling symlink to {}", raw.display()),
            ),
        ));
    }

    let ends_in_name = joined
        .components()
        .next_back()
        .is_some_and(|c| matches!(c, Component::Normal(_)));
    let resolved = match (joined.parent(), joined.file_name()) {
        (Some(parent), Some(name)) if ends_in_name => parent.canonicalize().at(parent)?.join(name),
        _ => joined.canonicalize().at(&joined)?,
    };
    let base = containing.canonicalize().at(containing)?;

    let relative = relative_path(&base, &resolved);
    if relative.as_os_str().is_empty() {
        return Ok(".".to_string());
    }
    relative.to_str().map(str::to_string).ok_or_else(|| {
        PackError::Invalid(format!(
            "{} points to a non-UTF-8 path {}",
            link.display(),
            relative.display()
        ))
    })
}

/// Compute a relative path from `from_dir` to `to_path`.
///
/// Both arguments must be absolute paths. The function walks up from
/// `from_dir` to the common ancestor and then descends into `to_path`.
///
/// Example: `relative_path("/a/b/c", "/a/b/d/e")` returns `"../d/e"`.
fn relative_path(from_dir: &Path, to_path: &Path) -> PathBuf {
    let from_components: Vec<_> = from_dir.components().collect();
    let to_components: Vec<_> = to_path.components().collect();

    let common_len = from_components
        .iter()
        .zip(to_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common_len..from_components.len() {
        result.push("..");
    }
    for part in &to_components[common_len..] {
        result.push(part);
    }
    result
}

/// Directory names deduplicated into a table, referenced by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTable {
    /// Unique directory names, in first-seen order.
    pub dirnames: Vec<String>,
    /// Per record: index into `dirnames`.
    pub dir_indexes: Vec<i32>,
    /// Per record: final path component.
    pub basenames: Vec<String>,
}

impl PathTable {
    /// Split every record's path into directory index and base name.
    pub fn build(records: &[FileRecord]) -> Self {
        let mut table = Self::default();
        let mut seen: HashMap<String, i32> = HashMap::new();

        for record in records {
            let dir = record.dirname();
            let index = match seen.get(&dir) {
                Some(&i) => i,
                None => {
                    let i = table.dirnames.len() as i32;
                    seen.insert(dir.clone(), i);
                    table.dirnames.push(dir);
                    i
                }
            };
            table.dir_indexes.push(index);
            table.basenames.push(record.basename().to_string());
        }

        table
    }
}
