//! Atomic output files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{IoResultExt, PackError};

/// Write `dest` through a temporary file in the same directory, then rename.
///
/// If `fill` fails, the temporary file is removed and `dest` is left
/// untouched (absent if it did not exist before).
///
/// # Errors
///
/// Propagates errors from `fill` and any I/O error creating, flushing or
/// renaming the file.
pub fn write_atomic<F>(dest: &Path, fill: F) -> Result<(), PackError>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), PackError>,
{
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).at(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tpack-")
        .tempfile_in(parent)
        .at(parent)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        fill(&mut writer)?;
        writer.flush().at(dest)?;
    }
    tmp.as_file().sync_all().at(dest)?;

    tmp.persist(dest).map_err(|e| PackError::io(dest, e.error))?;
    std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o644)).at(dest)?;
    Ok(())
}
