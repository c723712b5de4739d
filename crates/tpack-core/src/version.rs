//! Package version normalization.
//!
//! Bundles are usually versioned with `git describe` output such as
//! `1.2.3-4-g1a2b3c4d`. Package formats want that split into an upstream
//! version (`1.2.3`) and a release (`4`).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::PackError;

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-(\d+))?(?:-g[0-9a-fA-F]+)?$")
            .expect("version regex is valid")
    })
}

/// A normalized `version-release` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    /// `MAJOR.MINOR.PATCH`
    pub version: String,
    /// Commit count since the tag, `0` when absent.
    pub release: String,
}

impl PackageVersion {
    /// Parse `MAJOR.MINOR.PATCH[-COUNT[-gHASH]]`. The commit hash is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Version`] for anything else.
    pub fn parse(text: &str) -> Result<Self, PackError> {
        let caps = version_re()
            .captures(text.trim())
            .ok_or_else(|| PackError::Version(text.to_string()))?;

        Ok(Self {
            version: format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]),
            release: caps.get(4).map_or("0", |m| m.as_str()).to_string(),
        })
    }

    /// Replace the release component.
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    /// `version-release`
    pub fn full(&self) -> String {
        format!("{}-{}", self.version, self.release)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.release)
    }
}
