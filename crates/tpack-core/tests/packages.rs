use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tempfile::TempDir;
use tpack_core::collect::FileRecord;
use tpack_core::rpm::{LEAD_SIZE, build_rpm, tags};
use tpack_core::{
    CpioGzArchiver, Format, Layout, PackContext, PackError, PackageVersion, Payload,
    PayloadArchiver, pack,
};
use tpack_schema::{Arch, HeaderIndex, Md5Hex, Sha1Hex, parse_dependencies, read_index};

/// A two-file bundle plus separate output and scratch directories.
struct TestContext {
    _temp_dir: TempDir,
    bundle: PathBuf,
    output: PathBuf,
    scratch: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let bundle = temp_dir.path().join("bundle");
        let output = temp_dir.path().join("out");
        let scratch = temp_dir.path().join("scratch");
        std::fs::create_dir_all(bundle.join("conf")).expect("failed to create bundle");
        std::fs::create_dir_all(&scratch).expect("failed to create scratch root");
        std::fs::write(bundle.join("app.lua"), "require('conf')\nprint('hello')\n")
            .expect("failed to write app.lua");
        std::fs::write(bundle.join("conf/init.lua"), "return { listen = 3301 }\n")
            .expect("failed to write init.lua");

        Self {
            _temp_dir: temp_dir,
            bundle,
            output,
            scratch,
        }
    }

    fn layout(&self) -> Layout {
        Layout::new(&self.bundle, &self.output).with_scratch_root(&self.scratch)
    }

    fn context(&self) -> PackContext {
        let mut ctx = PackContext::new(
            "myapp",
            PackageVersion::parse("1.2.3-4-g1a2b3c4").expect("valid version"),
            Arch::X86_64,
        );
        ctx.dependencies = parse_dependencies(["tarantool>=1.10"]).expect("valid dependency");
        ctx.build_time = 1_700_000_000;
        ctx
    }

    fn build(&self, format: Format) -> PathBuf {
        pack(format, &self.layout(), &self.context(), &CpioGzArchiver::default())
            .expect("package build failed")
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch)
            .expect("scratch root exists")
            .next()
            .is_none()
    }
}

/// The sections of an RPM file, split at their encoded boundaries.
struct RpmSections {
    bytes: Vec<u8>,
    signature: HeaderIndex,
    header: HeaderIndex,
    header_start: usize,
}

impl RpmSections {
    fn read(path: &Path) -> Self {
        let bytes = std::fs::read(path).expect("failed to read package");
        let signature = read_index(&bytes[LEAD_SIZE..]).expect("signature parses");
        let header_start = LEAD_SIZE + signature.len.div_ceil(8) * 8;
        let header = read_index(&bytes[header_start..]).expect("header parses");
        Self {
            bytes,
            signature,
            header,
            header_start,
        }
    }

    fn header_bytes(&self) -> &[u8] {
        &self.bytes[self.header_start..self.header_start + self.header.len]
    }

    fn payload(&self) -> &[u8] {
        &self.bytes[self.header_start + self.header.len..]
    }
}

#[test]
fn test_rpm_layout_and_signature() {
    let ctx = TestContext::new();
    let path = ctx.build(Format::Rpm);
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("myapp-1.2.3-4.x86_64.rpm")
    );

    let rpm = RpmSections::read(&path);
    assert_eq!(&rpm.bytes[..4], &[0xed, 0xab, 0xee, 0xdb]);
    assert_eq!(&rpm.bytes[10..23], b"myapp-1.2.3-4");

    let payload = rpm.payload();
    let mut cpio = Vec::new();
    GzDecoder::new(payload)
        .read_to_end(&mut cpio)
        .expect("payload is gzip");

    let sig = &rpm.signature;
    assert_eq!(
        sig.int32(tags::SIG_SIZE),
        Some(vec![(rpm.header.len + payload.len()) as i32])
    );
    assert_eq!(sig.int32(tags::SIG_PAYLOADSIZE), Some(vec![cpio.len() as i32]));
    assert_eq!(
        sig.bin(tags::SIG_MD5),
        Some(&md5::compute(&rpm.bytes[rpm.header_start..]).0[..])
    );
    assert_eq!(
        sig.string(tags::SIG_SHA1),
        Some(Sha1Hex::compute(rpm.header_bytes()).to_string())
    );
}

#[test]
fn test_rpm_header_describes_bundle() {
    let ctx = TestContext::new();
    let rpm = RpmSections::read(&ctx.build(Format::Rpm));
    let header = &rpm.header;

    assert_eq!(header.string(tags::NAME).as_deref(), Some("myapp"));
    assert_eq!(header.string(tags::VERSION).as_deref(), Some("1.2.3"));
    assert_eq!(header.string(tags::RELEASE).as_deref(), Some("4"));
    assert_eq!(header.string(tags::ARCH).as_deref(), Some("x86_64"));
    assert_eq!(header.int32(tags::BUILDTIME), Some(vec![1_700_000_000]));

    assert_eq!(
        header.string_array(tags::BASENAMES),
        Some(vec!["app.lua".to_string(), "conf".to_string(), "init.lua".to_string()])
    );
    assert_eq!(
        header.string_array(tags::DIRNAMES),
        Some(vec!["/".to_string(), "/conf/".to_string()])
    );
    assert_eq!(header.int32(tags::DIRINDEXES), Some(vec![0, 0, 1]));

    let digests = header.string_array(tags::FILEDIGESTS).expect("digests present");
    let expected = Md5Hex::compute_file(&ctx.bundle.join("app.lua")).expect("hash app.lua");
    assert_eq!(digests[0], expected.as_str());
    assert_eq!(digests[1], "");

    let names = header.string_array(tags::REQUIRENAME).expect("requires present");
    let versions = header.string_array(tags::REQUIREVERSION).expect("versions present");
    let flags = header.int32(tags::REQUIREFLAGS).expect("flags present");
    assert_eq!(names.last().map(String::as_str), Some("tarantool"));
    assert_eq!(versions.last().map(String::as_str), Some("1.10"));
    assert_eq!(flags.last(), Some(&12));

    let region = header.entry(tags::HEADER_IMMUTABLE).expect("region entry");
    assert_eq!(region.kind, 7);
    assert_eq!(region.count, 16);
}

#[test]
fn test_rpm_payload_entries_are_sorted() {
    let ctx = TestContext::new();
    let rpm = RpmSections::read(&ctx.build(Format::Rpm));

    let mut cpio = Vec::new();
    GzDecoder::new(rpm.payload())
        .read_to_end(&mut cpio)
        .expect("payload is gzip");
    let text = String::from_utf8_lossy(&cpio);
    let positions: Vec<usize> = ["./app.lua\0", "./conf\0", "./conf/init.lua\0", "TRAILER!!!"]
        .iter()
        .map(|name| text.find(name).expect("entry present"))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_rpm_is_reproducible() {
    let ctx = TestContext::new();
    let first = std::fs::read(ctx.build(Format::Rpm)).expect("read first build");
    let second = std::fs::read(ctx.build(Format::Rpm)).expect("read second build");
    assert_eq!(first, second);
    assert!(ctx.scratch_is_empty());
}

#[test]
fn test_deb_members() {
    let ctx = TestContext::new();
    let path = ctx.build(Format::Deb);
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("myapp_1.2.3-4_amd64.deb")
    );

    let bytes = std::fs::read(&path).expect("read deb");
    assert_eq!(&bytes[..8], b"!<arch>\n");

    let mut members = Vec::new();
    let mut pos = 8;
    while pos < bytes.len() {
        let header = &bytes[pos..pos + 60];
        let name = String::from_utf8_lossy(&header[..16]).trim_end().to_string();
        let size: usize = String::from_utf8_lossy(&header[48..58])
            .trim()
            .parse()
            .expect("numeric member size");
        let data = bytes[pos + 60..pos + 60 + size].to_vec();
        members.push((name, data));
        pos += 60 + size + size % 2;
    }

    let names: Vec<&str> = members.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["debian-binary", "control.tar.gz", "data.tar.gz"]);
    assert_eq!(members[0].1, b"2.0\n");

    let mut control = String::new();
    let mut archive = tar::Archive::new(GzDecoder::new(&members[1].1[..]));
    let mut control_names = Vec::new();
    for entry in archive.entries().expect("control entries") {
        let mut entry = entry.expect("control entry");
        let name = entry.path().expect("entry path").to_string_lossy().into_owned();
        if name == "control" {
            entry.read_to_string(&mut control).expect("control is text");
        } else {
            assert_eq!(entry.header().mode().expect("mode"), 0o755);
        }
        control_names.push(name);
    }
    assert_eq!(control_names, vec!["control", "preinst", "postinst"]);
    assert!(control.contains("Package: myapp\n"));
    assert!(control.contains("Version: 1.2.3-4\n"));
    assert!(control.contains("Depends: tarantool (>= 1.10)\n"));

    let mut data = tar::Archive::new(GzDecoder::new(&members[2].1[..]));
    let data_names: Vec<String> = data
        .entries()
        .expect("data entries")
        .map(|e| {
            e.expect("data entry")
                .path()
                .expect("entry path")
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string()
        })
        .collect();
    assert_eq!(data_names, vec!["app.lua", "conf", "conf/init.lua"]);
    assert!(ctx.scratch_is_empty());
}

#[test]
fn test_tgz_contains_bundle() {
    let ctx = TestContext::new();
    let path = ctx.build(Format::Tgz);
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("myapp-1.2.3-4.tar.gz")
    );

    let file = std::fs::File::open(&path).expect("open tarball");
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut found = false;
    for entry in archive.entries().expect("entries") {
        let mut entry = entry.expect("entry");
        if entry.path().expect("path").to_string_lossy() == "conf/init.lua" {
            let mut body = String::new();
            entry.read_to_string(&mut body).expect("text");
            assert_eq!(body, "return { listen = 3301 }\n");
            found = true;
        }
    }
    assert!(found);
}

#[test]
fn test_missing_bundle_leaves_no_package() {
    let ctx = TestContext::new();
    let layout = Layout::new(ctx.bundle.join("missing"), &ctx.output)
        .with_scratch_root(&ctx.scratch);
    let err = pack(
        Format::Rpm,
        &layout,
        &ctx.context(),
        &CpioGzArchiver::default(),
    )
    .expect_err("missing bundle must fail");
    assert!(matches!(err, PackError::Io { .. }));
    assert!(!ctx.output.join("myapp-1.2.3-4.x86_64.rpm").exists());
    assert!(ctx.scratch_is_empty());
}

#[test]
fn test_dangling_symlink_fails_cleanly() {
    let ctx = TestContext::new();
    std::os::unix::fs::symlink("nowhere.lua", ctx.bundle.join("broken"))
        .expect("create symlink");

    let result = pack(
        Format::Rpm,
        &ctx.layout(),
        &ctx.context(),
        &CpioGzArchiver::default(),
    );
    assert!(result.is_err());
    assert!(!ctx.output.join("myapp-1.2.3-4.x86_64.rpm").exists());
    assert!(ctx.scratch_is_empty());
}

/// Runs the real archiver, then loses the compressed output.
struct DroppingArchiver;

impl PayloadArchiver for DroppingArchiver {
    fn archive(
        &self,
        root: &Path,
        records: &[FileRecord],
        out_dir: &Path,
    ) -> Result<Payload, PackError> {
        let payload = CpioGzArchiver::default().archive(root, records, out_dir)?;
        std::fs::remove_file(&payload.compressed).expect("remove compressed payload");
        Ok(payload)
    }
}

#[test]
fn test_rpm_rejects_incomplete_payload() {
    let ctx = TestContext::new();
    let err = build_rpm(&ctx.layout(), &ctx.context(), &DroppingArchiver)
        .expect_err("missing payload must fail");

    let path = match err {
        PackError::MissingArtifact { path } => path,
        other => panic!("expected MissingArtifact, got {other:?}"),
    };
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("payload.cpio.gz"));
    assert!(!ctx.output.join("myapp-1.2.3-4.x86_64.rpm").exists());
    assert!(ctx.scratch_is_empty());
}
