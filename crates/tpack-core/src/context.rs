//! Naming and versioning input of one build.

use tpack_schema::{Arch, Dependency};

use crate::version::PackageVersion;

/// Owner and group recorded for every packaged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// User name.
    pub owner: String,
    /// Group name.
    pub group: String,
}

impl Default for Ownership {
    fn default() -> Self {
        Self {
            owner: "root".to_string(),
            group: "root".to_string(),
        }
    }
}

/// Everything a package builder needs to know besides file locations.
///
/// Resolved once (usually from [`PackConfig`](crate::config::PackConfig))
/// and shared read-only between concurrent builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackContext {
    /// Package name.
    pub name: String,
    /// Normalized version and release.
    pub version: PackageVersion,
    /// Target architecture.
    pub arch: Arch,
    /// One-line summary.
    pub summary: String,
    /// Long description.
    pub description: String,
    /// License identifier.
    pub license: String,
    /// Project homepage.
    pub url: Option<String>,
    /// Maintainer (DEB `Maintainer:` field).
    pub maintainer: String,
    /// File ownership recorded in package metadata.
    pub ownership: Ownership,
    /// Runtime dependencies, in merge order.
    pub dependencies: Vec<Dependency>,
    /// User pre-install script body.
    pub preinst: Option<String>,
    /// User post-install script body.
    pub postinst: Option<String>,
    /// Build timestamp (seconds since the epoch).
    pub build_time: i64,
}

impl PackContext {
    /// Context with defaults for everything except identity.
    pub fn new(name: impl Into<String>, version: PackageVersion, arch: Arch) -> Self {
        let name = name.into();
        Self {
            summary: format!("{name} application bundle"),
            description: format!("{name} application bundle with its runtime environment"),
            name,
            version,
            arch,
            license: "N/A".to_string(),
            url: None,
            maintainer: "Unknown <unknown@localhost>".to_string(),
            ownership: Ownership::default(),
            dependencies: Vec::new(),
            preinst: None,
            postinst: None,
            build_time: 0,
        }
    }

    /// `name-version-release`, as used in the RPM lead and source package name.
    pub fn nvr(&self) -> String {
        format!("{}-{}", self.name, self.version.full())
    }
}
