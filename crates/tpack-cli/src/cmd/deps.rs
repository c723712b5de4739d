//! Dependency file commands

use std::path::Path;

use anyhow::{Context, Result};
use tpack_core::deps::load_dependency_file;

use crate::ui::Output;

/// Validate a dependency file and print its canonical form
pub fn check(path: &Path) -> Result<()> {
    let output = Output::new();
    let deps = load_dependency_file(path)
        .with_context(|| format!("Invalid dependency file {}", path.display()))?;

    for dep in &deps {
        println!("{dep}");
    }
    output.success(&format!(
        "{} is valid ({} dependencies)",
        path.display(),
        deps.len()
    ));
    Ok(())
}
