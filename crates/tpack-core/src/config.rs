//! `pack.toml` build configuration.
//!
//! ```toml
//! name = "myapp"
//! version = "1.2.3-4-g1a2b3c4"
//! arch = "x86_64"
//! deps = ["tarantool >= 1.10, < 3"]
//! deps_file = "deps.txt"
//! postinst = "scripts/postinst.sh"
//! runtime_deps = ["tarantool"]
//! ```
//!
//! Command-line flags are layered on top with [`PackConfig::overlay`], and
//! the result is resolved once into an immutable [`PackContext`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tpack_schema::{Arch, parse_dependencies};

use crate::context::{Ownership, PackContext};
use crate::deps::{load_dependency_file, merge_dependencies};
use crate::error::{IoResultExt, PackError};
use crate::runtime::probe_runtime;
use crate::version::PackageVersion;

/// Errors that can occur when loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but unusable.
    #[error("Invalid {key}: {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Build settings, from a file, flags, or both.
///
/// Every field is optional so that partial sources can be overlaid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackConfig {
    /// Package name.
    pub name: Option<String>,
    /// `MAJOR.MINOR.PATCH[-COUNT[-gHASH]]`
    pub version: Option<String>,
    /// Overrides the release derived from `version`.
    pub release: Option<String>,
    /// Target architecture; defaults to the host.
    pub arch: Option<String>,
    /// License identifier.
    pub license: Option<String>,
    /// One-line summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Project homepage.
    pub url: Option<String>,
    /// DEB maintainer.
    pub maintainer: Option<String>,
    /// Owner recorded for packaged files.
    pub owner: Option<String>,
    /// Group recorded for packaged files.
    pub group: Option<String>,
    /// Dependency lines.
    #[serde(default)]
    pub deps: Vec<String>,
    /// File with one dependency per line.
    pub deps_file: Option<PathBuf>,
    /// Pre-install script file.
    pub preinst: Option<PathBuf>,
    /// Post-install script file.
    pub postinst: Option<PathBuf>,
    /// Programs whose installed version becomes an exact dependency.
    #[serde(default)]
    pub runtime_deps: Vec<String>,
}

impl PackConfig {
    /// Load a config file. Relative paths inside it are resolved against
    /// the file's directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Parse` if the TOML content is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.rebase(base))
    }

    /// Parse a config from a TOML string. Paths are kept as written.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the TOML content is invalid or has
    /// unknown keys.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve relative script and dependency-file paths against `base`.
    pub fn rebase(mut self, base: &Path) -> Self {
        for path in [&mut self.deps_file, &mut self.preinst, &mut self.postinst]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Layer `top` over `self`: scalar values set in `top` win, list values
    /// are appended after ours.
    pub fn overlay(mut self, top: PackConfig) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if top.$field.is_some() { self.$field = top.$field; })*
            };
        }
        take!(
            name, version, release, arch, license, summary, description, url, maintainer,
            owner, group, deps_file, preinst, postinst
        );
        self.deps.extend(top.deps);
        self.runtime_deps.extend(top.runtime_deps);
        self
    }

    /// Resolve into a build context.
    ///
    /// Reads the script files and the dependency file, and probes every
    /// runtime dependency. Dependencies are merged in the order: `deps`
    /// lines, dependency file, runtime probes.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] for a missing name or version, an unparseable
    /// version, architecture or dependency, unreadable files, and failed
    /// runtime probes.
    pub fn resolve(&self, build_time: i64) -> Result<PackContext, PackError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ConfigError::Invalid {
                key: "name",
                reason: "package name is required".to_string(),
            })?;
        let version_text = self.version.as_deref().ok_or(ConfigError::Invalid {
            key: "version",
            reason: "package version is required".to_string(),
        })?;

        let mut version = PackageVersion::parse(version_text)?;
        if let Some(release) = &self.release {
            version = version.with_release(release.clone());
        }

        let arch = match &self.arch {
            Some(arch) => arch
                .parse::<Arch>()
                .map_err(|reason| ConfigError::Invalid { key: "arch", reason })?,
            None => Arch::current(),
        };

        let mut ctx = PackContext::new(name, version, arch);
        ctx.build_time = build_time;
        if let Some(license) = &self.license {
            ctx.license.clone_from(license);
        }
        if let Some(summary) = &self.summary {
            ctx.summary.clone_from(summary);
        }
        if let Some(description) = &self.description {
            ctx.description.clone_from(description);
        }
        if let Some(maintainer) = &self.maintainer {
            ctx.maintainer.clone_from(maintainer);
        }
        ctx.url.clone_from(&self.url);

        let defaults = Ownership::default();
        ctx.ownership = Ownership {
            owner: self.owner.clone().unwrap_or(defaults.owner),
            group: self.group.clone().unwrap_or(defaults.group),
        };

        ctx.preinst = self.preinst.as_deref().map(read_script).transpose()?;
        ctx.postinst = self.postinst.as_deref().map(read_script).transpose()?;

        let inline = parse_dependencies(&self.deps)?;
        let from_file = match &self.deps_file {
            Some(path) => load_dependency_file(path)?,
            None => Vec::new(),
        };
        let probed = self
            .runtime_deps
            .iter()
            .map(|program| probe_runtime(program))
            .collect::<Result<Vec<_>, _>>()?;
        ctx.dependencies = merge_dependencies([inline, from_file, probed]);

        Ok(ctx)
    }
}

fn read_script(path: &Path) -> Result<String, PackError> {
    fs::read_to_string(path).at(path)
}
