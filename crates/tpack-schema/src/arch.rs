//! Target architectures and their per-format spellings.

/// Target architecture of a built package.
///
/// Each package format spells architectures differently, and the RPM lead
/// additionally carries a legacy numeric code.
///
/// # Example
///
/// ```
/// use tpack_schema::Arch;
///
/// let arch: Arch = "amd64".parse().unwrap();
/// assert_eq!(arch.rpm_name(), "x86_64");
/// assert_eq!(arch.deb_name(), "amd64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Arch {
    /// `x86_64` (Intel / AMD 64-bit)
    #[default]
    X86_64,
    /// ARM64 (`aarch64`)
    Aarch64,
}

impl Arch {
    /// Get the architecture of the host running the build
    pub fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        {
            Self::Aarch64
        }
        #[cfg(not(target_arch = "aarch64"))]
        {
            Self::X86_64
        }
    }

    /// Architecture name as written in RPM headers and file names.
    pub fn rpm_name(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }

    /// Debian architecture name (`amd64` / `arm64`).
    pub fn deb_name(&self) -> &'static str {
        match self {
            Self::X86_64 => "amd64",
            Self::Aarch64 => "arm64",
        }
    }

    /// Numeric architecture code stored in the RPM lead (`arch_canon` table of rpmrc).
    pub fn rpm_archnum(&self) -> u16 {
        match self {
            Self::X86_64 => 1,
            Self::Aarch64 => 19,
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rpm_name())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}
