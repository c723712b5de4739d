//! Output format selection and dispatch.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::context::PackContext;
use crate::error::PackError;
use crate::layout::Layout;
use crate::payload::PayloadArchiver;

/// Package formats this crate can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// RPM package.
    Rpm,
    /// Debian package.
    Deb,
    /// Gzip-compressed tarball.
    Tgz,
}

impl Format {
    /// Every supported format.
    pub const ALL: [Format; 3] = [Format::Rpm, Format::Deb, Format::Tgz];

    /// Lowercase name as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rpm => "rpm",
            Self::Deb => "deb",
            Self::Tgz => "tgz",
        }
    }

    /// Conventional file name of the package built from `ctx`.
    pub fn file_name(self, ctx: &PackContext) -> String {
        let full = ctx.version.full();
        match self {
            Self::Rpm => format!("{}-{full}.{}.rpm", ctx.name, ctx.arch.rpm_name()),
            Self::Deb => format!("{}_{full}_{}.deb", ctx.name, ctx.arch.deb_name()),
            Self::Tgz => format!("{}-{full}.tar.gz", ctx.name),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpm" => Ok(Self::Rpm),
            "deb" => Ok(Self::Deb),
            "tgz" | "tar.gz" => Ok(Self::Tgz),
            "docker" => Err(PackError::Invalid(
                "Docker images are not supported; build a tgz and use it in a Dockerfile"
                    .to_string(),
            )),
            other => Err(PackError::Invalid(format!(
                "Unknown package type {other:?} (expected rpm, deb or tgz)"
            ))),
        }
    }
}

/// Build one package of `format` and return its path.
///
/// `archiver` is only consulted for formats with a separate payload (RPM).
///
/// # Errors
///
/// Propagates the builder's [`PackError`].
pub fn pack(
    format: Format,
    layout: &Layout,
    ctx: &PackContext,
    archiver: &dyn PayloadArchiver,
) -> Result<PathBuf, PackError> {
    if ctx.name.trim().is_empty() {
        return Err(PackError::Invalid("Package name is empty".to_string()));
    }
    match format {
        Format::Rpm => crate::rpm::build_rpm(layout, ctx, archiver),
        Format::Deb => crate::deb::build_deb(layout, ctx),
        Format::Tgz => crate::tgz::build_tgz(layout, ctx),
    }
}
