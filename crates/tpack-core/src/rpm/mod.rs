//! RPM package assembly.
//!
//! An RPM file is `Lead ∥ Signature ∥ Header ∥ Payload`. The header
//! describes the package and its files, the payload is the compressed
//! archive of the bundle, and the signature carries digests over the
//! header and payload, so it can only be computed once both exist on disk.

pub mod header;
pub mod lead;
pub mod signature;
pub mod tags;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use tpack_schema::encode;

use crate::collect::collect_file_records;
use crate::context::PackContext;
use crate::error::{IoResultExt, PackError};
use crate::io::write_atomic;
use crate::layout::Layout;
use crate::pack::Format;
use crate::payload::PayloadArchiver;

pub use header::{Requires, build_header};
pub use lead::{LEAD_SIZE, Lead};
pub use signature::Signature;

/// Build `name-version-release.arch.rpm` in the layout's output directory.
///
/// Intermediate files live in a private scratch directory that is removed
/// whether or not the build succeeds. The destination is written
/// atomically, so a failed build never leaves a truncated package behind.
///
/// # Errors
///
/// Returns [`PackError`] if the bundle cannot be read, the archiver fails
/// or omits an output, a tag fails to encode, or the package cannot be
/// written.
pub fn build_rpm(
    layout: &Layout,
    ctx: &PackContext,
    archiver: &dyn PayloadArchiver,
) -> Result<PathBuf, PackError> {
    layout.validate()?;
    let scratch = layout.scratch_dir("rpm")?;
    let dest = layout.output_dir().join(Format::Rpm.file_name(ctx));
    tracing::info!("Building {}", dest.display());

    let records = collect_file_records(layout.bundle_dir(), &ctx.ownership)?;
    tracing::debug!("Collected {} file records", records.len());

    let payload = archiver.archive(layout.bundle_dir(), &records, scratch.path())?;
    payload.verify()?;
    let payload_size = payload.archive_size()?;

    let header = encode(&build_header(ctx, &records), tags::HEADER_IMMUTABLE)?;

    let header_and_payload = scratch.path().join("header-payload");
    {
        let mut out = BufWriter::new(File::create(&header_and_payload).at(&header_and_payload)?);
        out.write_all(&header).at(&header_and_payload)?;
        let mut compressed = BufReader::new(File::open(&payload.compressed).at(&payload.compressed)?);
        io::copy(&mut compressed, &mut out).at(&header_and_payload)?;
        out.flush().at(&header_and_payload)?;
    }

    let signature = Signature::compute(&header_and_payload, header.len(), payload_size)?;
    let signature_bytes = signature.encode()?;
    tracing::debug!(
        "Signature: header sha1 {}, {} bytes signed, {} bytes uncompressed payload",
        signature.header_sha1,
        signature.size,
        signature.payload_size
    );

    let lead = Lead::new(ctx.nvr(), ctx.arch).to_bytes();

    write_atomic(&dest, |out| {
        out.write_all(&lead).at(&dest)?;
        out.write_all(&signature_bytes).at(&dest)?;
        let mut body = BufReader::new(File::open(&header_and_payload).at(&header_and_payload)?);
        io::copy(&mut body, out).at(&dest)?;
        Ok(())
    })?;

    tracing::info!("Created {}", dest.display());
    Ok(dest)
}
