//! Pin installed runtimes as exact-version dependencies.

use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use tpack_schema::Dependency;

use crate::error::{IoResultExt, PackError};

fn semver_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.\d+\.\d+)").expect("semver regex is valid"))
}

/// First `X.Y.Z` in a `--version` banner.
pub fn parse_version_output(output: &str) -> Option<String> {
    semver_re()
        .captures(output)
        .map(|caps| caps[1].to_string())
}

/// Run `program --version` and return `program==X.Y.Z`.
///
/// # Errors
///
/// Returns [`PackError::Runtime`] if the program is not on `PATH`, exits
/// unsuccessfully or prints no version, and [`PackError::Io`] if it cannot
/// be spawned.
pub fn probe_runtime(program: &str) -> Result<Dependency, PackError> {
    let path = which::which(program)
        .map_err(|e| PackError::Runtime(format!("{program} not found: {e}")))?;
    let output = Command::new(&path).arg("--version").output().at(&path)?;
    if !output.status.success() {
        return Err(PackError::Runtime(format!(
            "{} --version exited with {}",
            path.display(),
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = parse_version_output(&stdout)
        .ok_or_else(|| PackError::Runtime(format!("no version in `{program} --version` output")))?;
    tracing::debug!("Probed {program} {version} at {}", path.display());
    Ok(Dependency::exact(program, version))
}
