//! Plain compressed tarball of the bundle.

use std::path::PathBuf;

use crate::archive::TarGz;
use crate::context::PackContext;
use crate::error::{IoResultExt, PackError};
use crate::io::write_atomic;
use crate::layout::Layout;
use crate::pack::Format;

/// Build `name-version-release.tar.gz` in the layout's output directory.
///
/// # Errors
///
/// Returns [`PackError`] if the bundle cannot be read or the tarball cannot
/// be written.
pub fn build_tgz(layout: &Layout, ctx: &PackContext) -> Result<PathBuf, PackError> {
    layout.validate()?;
    let dest = layout.output_dir().join(Format::Tgz.file_name(ctx));
    tracing::info!("Building {}", dest.display());

    write_atomic(&dest, |out| {
        let mut tgz = TarGz::new(out, 9);
        tgz.append_tree(layout.bundle_dir())?;
        tgz.finish().at(&dest)?;
        Ok(())
    })?;

    tracing::info!("Created {}", dest.display());
    Ok(dest)
}
