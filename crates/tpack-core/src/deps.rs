//! Dependency sources and merging.

use std::collections::HashSet;
use std::path::Path;

use tpack_schema::{Dependency, parse_dependencies};

use crate::error::{IoResultExt, PackError};

/// Parse a dependency file: one dependency per line, blank and comment
/// lines ignored.
///
/// # Errors
///
/// Returns [`PackError::Io`] if the file cannot be read and
/// [`PackError::Dependency`] for the first malformed line.
pub fn load_dependency_file(path: &Path) -> Result<Vec<Dependency>, PackError> {
    let content = std::fs::read_to_string(path).at(path)?;
    let deps = parse_dependencies(content.lines())?;
    tracing::debug!("Loaded {} dependencies from {}", deps.len(), path.display());
    Ok(deps)
}

/// Concatenate dependency lists in the given order.
///
/// Names that occur more than once are kept as-is and reported, since the
/// package manager evaluates every relation anyway.
pub fn merge_dependencies<I>(sources: I) -> Vec<Dependency>
where
    I: IntoIterator<Item = Vec<Dependency>>,
{
    let merged: Vec<Dependency> = sources.into_iter().flatten().collect();

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for dep in &merged {
        if !seen.insert(dep.name.as_str()) && reported.insert(dep.name.as_str()) {
            tracing::warn!(
                "Dependency {} is declared more than once; all constraints are kept",
                dep.name
            );
        }
    }
    merged
}
