//! Domain-specific errors for package builds

use std::path::{Path, PathBuf};

use thiserror::Error;
use tpack_schema::{DependencyFormatError, EncodingError};

use crate::config::ConfigError;

/// Everything that can stop a package build.
#[derive(Error, Debug)]
pub enum PackError {
    /// Malformed dependency text.
    #[error(transparent)]
    Dependency(#[from] DependencyFormatError),

    /// A header tag could not be encoded. Indicates a defect, not bad input.
    #[error("Header encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Filesystem failure, with the path that caused it.
    #[error("{}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The payload collaborator returned without producing an expected file.
    #[error("Payload archiver did not produce {}", path.display())]
    MissingArtifact {
        /// The file that should exist.
        path: PathBuf,
    },

    /// Version string that cannot be normalized.
    #[error("Invalid package version {0:?}: expected MAJOR.MINOR.PATCH[-COUNT[-gHASH]]")]
    Version(String),

    /// Configuration file problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Probing an installed runtime for its version failed.
    #[error("Runtime probe failed: {0}")]
    Runtime(String),

    /// Invalid build input (missing name, bundle is not a directory, ...).
    #[error("{0}")]
    Invalid(String),
}

impl PackError {
    /// Build an [`PackError::Io`] for `path`.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Attach the offending path to an `io::Result`.
pub trait IoResultExt<T> {
    /// Convert the error into [`PackError::Io`] carrying `path`.
    fn at(self, path: impl AsRef<Path>) -> Result<T, PackError>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T, PackError> {
        self.map_err(|e| PackError::io(path, e))
    }
}
