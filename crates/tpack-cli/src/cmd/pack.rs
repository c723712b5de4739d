//! Build packages

use std::sync::Arc;

use anyhow::{Context, Result};
use tpack_core::{CpioGzArchiver, Format, Layout, PackConfig, PackContext};

use crate::PackArgs;
use crate::ui::Output;

/// Build every requested format concurrently, one blocking task each.
pub async fn pack(args: PackArgs) -> Result<()> {
    let output = Output::new();

    let base = match &args.config {
        Some(path) => PackConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => PackConfig::default(),
    };
    let config = base.overlay(args.to_config());
    let ctx = config
        .resolve(build_time()?)
        .context("Invalid build settings")?;

    let mut layout = Layout::new(&args.bundle_dir, &args.output_dir);
    if let Some(scratch) = &args.scratch_dir {
        layout = layout.with_scratch_root(scratch);
    }
    layout
        .validate()
        .with_context(|| format!("Cannot use bundle {}", args.bundle_dir.display()))?;

    let formats = args.formats();
    output.info(&format!(
        "Packing {} {} ({}) as {}",
        ctx.name,
        ctx.version.full(),
        ctx.arch,
        formats
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    ));
    for dep in &ctx.dependencies {
        tracing::debug!("Depends on {dep}");
    }
    if formats.contains(&Format::Deb) && (ctx.preinst.is_some() || ctx.postinst.is_some()) {
        output.warning("DEB install scripts are used verbatim; the built-in bootstrap is skipped");
    }

    let ctx: Arc<PackContext> = Arc::new(ctx);
    let layout = Arc::new(layout);
    let archiver = Arc::new(CpioGzArchiver::default());

    let tasks = formats.into_iter().map(|format| {
        let ctx = Arc::clone(&ctx);
        let layout = Arc::clone(&layout);
        let archiver = Arc::clone(&archiver);
        tokio::task::spawn_blocking(move || {
            (
                format,
                tpack_core::pack(format, &layout, &ctx, archiver.as_ref()),
            )
        })
    });
    let results = futures::future::try_join_all(tasks)
        .await
        .context("Package build task panicked")?;

    let total = results.len();
    let mut failed = 0;
    for (format, result) in results {
        match result {
            Ok(path) => output.success(&format!("Created {}", path.display())),
            Err(e) => {
                failed += 1;
                output.error(&format!("{format} build failed: {e}"));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} package builds failed");
    }
    Ok(())
}

/// Seconds since the epoch, pinned by `SOURCE_DATE_EPOCH` when set.
fn build_time() -> Result<i64> {
    match std::env::var("SOURCE_DATE_EPOCH") {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("SOURCE_DATE_EPOCH is not a timestamp: {value:?}")),
        Err(_) => Ok(chrono::Utc::now().timestamp()),
    }
}
