//! Filesystem locations of one build.
//!
//! A [`Layout`] is constructed once and handed to every builder by
//! reference. Nothing in this crate computes paths from global state, so
//! two builds with different layouts never interfere.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{IoResultExt, PackError};

/// Where the bundle lives, where packages go, and where scratch space is allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    bundle_dir: PathBuf,
    output_dir: PathBuf,
    scratch_root: PathBuf,
}

impl Layout {
    /// Layout with scratch space under the system temp directory.
    pub fn new(bundle_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            output_dir: output_dir.into(),
            scratch_root: std::env::temp_dir(),
        }
    }

    /// Allocate scratch directories under `root` instead.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    /// Root of the prepared file tree. Its contents map to `/` on the target.
    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }

    /// Directory receiving finished packages.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Check that the bundle exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] if the bundle cannot be stat'ed and
    /// [`PackError::Invalid`] if it is not a directory.
    pub fn validate(&self) -> Result<(), PackError> {
        let meta = std::fs::metadata(&self.bundle_dir).at(&self.bundle_dir)?;
        if !meta.is_dir() {
            return Err(PackError::Invalid(format!(
                "Bundle {} is not a directory",
                self.bundle_dir.display()
            )));
        }
        Ok(())
    }

    /// Create a private, single-use scratch directory.
    ///
    /// The directory (mode 0700) is removed when the returned guard drops,
    /// on success and on failure alike.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] if the directory cannot be created.
    pub fn scratch_dir(&self, label: &str) -> Result<TempDir, PackError> {
        std::fs::create_dir_all(&self.scratch_root).at(&self.scratch_root)?;
        tempfile::Builder::new()
            .prefix(&format!("tpack-{label}-"))
            .tempdir_in(&self.scratch_root)
            .at(&self.scratch_root)
    }
}
