//! Debian package assembly.
//!
//! A `.deb` is an `ar` archive of `debian-binary`, `control.tar.gz` and
//! `data.tar.gz`, in that order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::archive::{ArWriter, TarGz};
use crate::collect::{FileKind, collect_file_records};
use crate::context::PackContext;
use crate::error::{IoResultExt, PackError};
use crate::io::write_atomic;
use crate::layout::Layout;
use crate::pack::Format;
use crate::scripts::{POSTINST_BOOTSTRAP, PREINST_BOOTSTRAP, deb_script};

const FORMAT_MARKER: &[u8] = b"2.0\n";
const GZIP_LEVEL: u32 = 9;
const SCRIPT_MODE: u32 = 0o755;
const CONTROL_MODE: u32 = 0o644;

/// Render the `control` file.
///
/// `installed_size` is in KiB. `Depends:` is left out when there are no
/// dependencies.
pub fn control_file(ctx: &PackContext, installed_size: u64) -> String {
    let mut control = format!(
        "Package: {}\nVersion: {}\nArchitecture: {}\nMaintainer: {}\nInstalled-Size: {}\n",
        ctx.name,
        ctx.version.full(),
        ctx.arch.deb_name(),
        ctx.maintainer,
        installed_size,
    );
    if !ctx.dependencies.is_empty() {
        let depends = ctx
            .dependencies
            .iter()
            .map(tpack_schema::Dependency::render_deb)
            .collect::<Vec<_>>()
            .join(", ");
        control.push_str(&format!("Depends: {depends}\n"));
    }
    if let Some(url) = &ctx.url {
        control.push_str(&format!("Homepage: {url}\n"));
    }
    control.push_str(&format!("Description: {}\n", ctx.summary));
    for line in ctx.description.lines() {
        if line.trim().is_empty() {
            control.push_str(" .\n");
        } else {
            control.push_str(&format!(" {line}\n"));
        }
    }
    control
}

/// Build `name_version-release_arch.deb` in the layout's output directory.
///
/// # Errors
///
/// Returns [`PackError`] if the bundle cannot be read or the package cannot
/// be written.
pub fn build_deb(layout: &Layout, ctx: &PackContext) -> Result<PathBuf, PackError> {
    layout.validate()?;
    let scratch = layout.scratch_dir("deb")?;
    let dest = layout.output_dir().join(Format::Deb.file_name(ctx));
    tracing::info!("Building {}", dest.display());

    let records = collect_file_records(layout.bundle_dir(), &ctx.ownership)?;
    let installed_bytes: u64 = records
        .iter()
        .filter(|r| r.kind == FileKind::Regular)
        .map(|r| r.size)
        .sum();
    let installed_size = installed_bytes.div_ceil(1024);

    let control_tar = scratch.path().join("control.tar.gz");
    {
        let out = BufWriter::new(File::create(&control_tar).at(&control_tar)?);
        let mut tgz = TarGz::new(out, GZIP_LEVEL);
        let control = control_file(ctx, installed_size);
        let preinst = deb_script(PREINST_BOOTSTRAP, ctx.preinst.as_deref());
        let postinst = deb_script(POSTINST_BOOTSTRAP, ctx.postinst.as_deref());
        tgz.append_bytes("control", CONTROL_MODE, control.as_bytes())
            .at(&control_tar)?;
        tgz.append_bytes("preinst", SCRIPT_MODE, preinst.as_bytes())
            .at(&control_tar)?;
        tgz.append_bytes("postinst", SCRIPT_MODE, postinst.as_bytes())
            .at(&control_tar)?;
        tgz.finish().at(&control_tar)?.flush().at(&control_tar)?;
    }

    let data_tar = scratch.path().join("data.tar.gz");
    {
        let out = BufWriter::new(File::create(&data_tar).at(&data_tar)?);
        let mut tgz = TarGz::new(out, GZIP_LEVEL);
        tgz.append_tree(layout.bundle_dir())?;
        tgz.finish().at(&data_tar)?.flush().at(&data_tar)?;
    }
    tracing::debug!(
        "Packed {} entries, installed size {installed_size} KiB",
        records.len()
    );

    let control_bytes = std::fs::read(&control_tar).at(&control_tar)?;
    let data_bytes = std::fs::read(&data_tar).at(&data_tar)?;
    write_atomic(&dest, |out| {
        let mut ar = ArWriter::new(out, ctx.build_time).at(&dest)?;
        ar.append("debian-binary", FORMAT_MARKER).at(&dest)?;
        ar.append("control.tar.gz", &control_bytes).at(&dest)?;
        ar.append("data.tar.gz", &data_bytes).at(&dest)?;
        Ok(())
    })?;

    tracing::info!("Created {}", dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::PackageVersion;
    use tpack_schema::{Arch, parse_dependencies};

    fn ctx() -> PackContext {
        PackContext::new(
            "myapp",
            PackageVersion::parse("1.2.3-4").unwrap(),
            Arch::Aarch64,
        )
    }

    #[test]
    fn control_without_dependencies() {
        let control = control_file(&ctx(), 12);
        assert!(control.starts_with("Package: myapp\nVersion: 1.2.3-4\nArchitecture: arm64\n"));
        assert!(control.contains("Installed-Size: 12\n"));
        assert!(!control.contains("Depends:"));
        assert!(control.contains("Description: myapp application bundle\n "));
    }

    #[test]
    fn control_renders_debian_operators() {
        let mut ctx = ctx();
        ctx.dependencies = parse_dependencies(["tarantool>=1.10,<2", "unzip", "cartridge==2.1"]).unwrap();
        let control = control_file(&ctx, 0);
        assert!(control.contains(
            "Depends: tarantool (>= 1.10), tarantool (<< 2), unzip, cartridge (= 2.1)\n"
        ));
    }

    #[test]
    fn blank_description_lines_become_dots() {
        let mut ctx = ctx();
        ctx.description = "first\n\nsecond".to_string();
        let control = control_file(&ctx, 0);
        assert!(control.ends_with(" first\n .\n second\n"));
    }
}
