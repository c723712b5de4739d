//! Metadata header construction.

use tpack_schema::{Tag, TagSet};

use super::tags;
use crate::collect::{FileKind, FileRecord, PathTable};
use crate::context::PackContext;
use crate::scripts::{POSTINST_BOOTSTRAP, PREINST_BOOTSTRAP, rpm_script};

const OS: &str = "linux";
const GROUP: &str = "Unspecified";
const PAYLOAD_FORMAT: &str = "cpio";
const PAYLOAD_COMPRESSOR: &str = "gzip";
const PAYLOAD_FLAGS: &str = "9";
const RPM_VERSION: &str = "4.11.3";
const SCRIPT_PROG: &str = "/bin/sh";
/// Packaged content (`RPMFILE_NOREPLACE`; inert without `RPMFILE_CONFIG`).
const FILE_FLAG_CONTENT: i32 = 1 << 4;
/// Directories carry no attribute bits (`RPMFILE_NONE`).
const FILE_FLAG_DIRECTORY: i32 = 0;

/// rpm features the package format relies on.
const RPMLIB_FEATURES: &[(&str, &str)] = &[
    ("rpmlib(CompressedFileNames)", "3.0.4-1"),
    ("rpmlib(PayloadFilesHavePrefix)", "4.0-1"),
];

/// Parallel requirement arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requires {
    /// Package or feature names.
    pub names: Vec<String>,
    /// `RPMSENSE_*` bits.
    pub flags: Vec<i32>,
    /// Versions (empty for unversioned requirements).
    pub versions: Vec<String>,
}

impl Requires {
    /// Flatten the context's dependencies, preceded by the rpmlib features.
    ///
    /// A dependency with several relations yields one entry per relation;
    /// a dependency with none yields a single unversioned entry.
    pub fn from_context(ctx: &PackContext) -> Self {
        let mut req = Self::default();
        for (name, version) in RPMLIB_FEATURES {
            req.push(name, tags::SENSE_RPMLIB | tags::SENSE_LESS_EQUAL, version);
        }
        for dep in &ctx.dependencies {
            if dep.relations.is_empty() {
                req.push(&dep.name, 0, "");
            }
            for rel in &dep.relations {
                req.push(&dep.name, rel.operator.rpm_flags(), &rel.version);
            }
        }
        req
    }

    fn push(&mut self, name: &str, flags: i32, version: &str) {
        self.names.push(name.to_string());
        self.flags.push(flags);
        self.versions.push(version.to_string());
    }
}

fn file_flags(kind: FileKind) -> i32 {
    match kind {
        FileKind::Directory => FILE_FLAG_DIRECTORY,
        FileKind::Regular | FileKind::Symlink => FILE_FLAG_CONTENT,
    }
}

/// Build the metadata header for `records` in their given order.
pub fn build_header(ctx: &PackContext, records: &[FileRecord]) -> TagSet {
    let mut set = TagSet::new();
    let version = &ctx.version;
    let total_size: u64 = records.iter().map(|r| r.size).sum();

    set.push(Tag::string(tags::NAME, &ctx.name));
    set.push(Tag::string(tags::VERSION, &version.version));
    set.push(Tag::string(tags::RELEASE, &version.release));
    set.push(Tag::string(tags::SUMMARY, &ctx.summary));
    set.push(Tag::string(tags::DESCRIPTION, &ctx.description));
    set.push(Tag::int32(tags::BUILDTIME, [ctx.build_time as i32]));
    if let Ok(size) = i32::try_from(total_size) {
        set.push(Tag::int32(tags::SIZE, [size]));
    }
    set.push(Tag::string(tags::LICENSE, &ctx.license));
    set.push(Tag::string(tags::GROUP, GROUP));
    if let Some(url) = &ctx.url {
        set.push(Tag::string(tags::URL, url));
    }
    set.push(Tag::string(tags::OS, OS));
    set.push(Tag::string(tags::ARCH, ctx.arch.rpm_name()));
    set.push(Tag::string(
        tags::PREIN,
        rpm_script(PREINST_BOOTSTRAP, ctx.preinst.as_deref()),
    ));
    set.push(Tag::string(
        tags::POSTIN,
        rpm_script(POSTINST_BOOTSTRAP, ctx.postinst.as_deref()),
    ));

    let large_files = records.iter().any(|r| i32::try_from(r.size).is_err());
    if !records.is_empty() {
        if !large_files {
            set.push(Tag::int32(
                tags::FILESIZES,
                records.iter().map(|r| r.size as i32).collect::<Vec<_>>(),
            ));
        }
        set.push(Tag::int16(
            tags::FILEMODES,
            records
                .iter()
                .map(|r| r.mode as u16 as i16)
                .collect::<Vec<_>>(),
        ));
        set.push(Tag::int16(tags::FILERDEVS, vec![0i16; records.len()]));
        set.push(Tag::int32(
            tags::FILEMTIMES,
            records.iter().map(|r| r.mtime as i32).collect::<Vec<_>>(),
        ));
        set.push(Tag::string_array(
            tags::FILEDIGESTS,
            records.iter().map(|r| r.digest.as_str()),
        ));
        set.push(Tag::string_array(
            tags::FILELINKTOS,
            records.iter().map(|r| r.link_target.as_str()),
        ));
        set.push(Tag::int32(
            tags::FILEFLAGS,
            records.iter().map(|r| file_flags(r.kind)).collect::<Vec<_>>(),
        ));
        set.push(Tag::string_array(
            tags::FILEUSERNAME,
            records.iter().map(|r| r.owner.as_str()),
        ));
        set.push(Tag::string_array(
            tags::FILEGROUPNAME,
            records.iter().map(|r| r.group.as_str()),
        ));
    }

    set.push(Tag::string(
        tags::SOURCERPM,
        format!("{}.src.rpm", ctx.nvr()),
    ));
    set.push(Tag::string_array(tags::PROVIDENAME, [ctx.name.as_str()]));

    let requires = Requires::from_context(ctx);
    set.push(Tag::int32(tags::REQUIREFLAGS, requires.flags));
    set.push(Tag::string_array(tags::REQUIRENAME, requires.names));
    set.push(Tag::string_array(tags::REQUIREVERSION, requires.versions));

    set.push(Tag::string(tags::RPMVERSION, RPM_VERSION));
    set.push(Tag::string(tags::PREINPROG, SCRIPT_PROG));
    set.push(Tag::string(tags::POSTINPROG, SCRIPT_PROG));

    if !records.is_empty() {
        set.push(Tag::int32(
            tags::FILEDEVICES,
            records.iter().map(|r| r.device as i32).collect::<Vec<_>>(),
        ));
        set.push(Tag::int32(
            tags::FILEINODES,
            records.iter().map(|r| r.inode as i32).collect::<Vec<_>>(),
        ));
        set.push(Tag::string_array(
            tags::FILELANGS,
            records.iter().map(|r| r.lang.as_str()),
        ));
    }

    set.push(Tag::int32(tags::PROVIDEFLAGS, [tags::SENSE_EQUAL]));
    set.push(Tag::string_array(tags::PROVIDEVERSION, [version.full()]));

    if !records.is_empty() {
        let table = PathTable::build(records);
        set.push(Tag::int32(tags::DIRINDEXES, table.dir_indexes));
        set.push(Tag::string_array(tags::BASENAMES, table.basenames));
        set.push(Tag::string_array(tags::DIRNAMES, table.dirnames));
    }

    set.push(Tag::string(tags::PAYLOADFORMAT, PAYLOAD_FORMAT));
    set.push(Tag::string(tags::PAYLOADCOMPRESSOR, PAYLOAD_COMPRESSOR));
    set.push(Tag::string(tags::PAYLOADFLAGS, PAYLOAD_FLAGS));

    if large_files {
        set.push(Tag::int64(
            tags::LONGFILESIZES,
            records.iter().map(|r| r.size as i64).collect::<Vec<_>>(),
        ));
    }
    if i32::try_from(total_size).is_err() {
        set.push(Tag::int64(tags::LONGSIZE, [total_size as i64]));
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::PackageVersion;
    use tpack_schema::{Arch, TagValue, parse_dependencies};

    fn ctx() -> PackContext {
        let mut ctx = PackContext::new(
            "myapp",
            PackageVersion::parse("1.2.3-4").unwrap(),
            Arch::X86_64,
        );
        ctx.dependencies = parse_dependencies(["tarantool>=1.10,<3", "unzip"]).unwrap();
        ctx
    }

    fn record(path: &str, kind: FileKind) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            kind,
            owner: "root".into(),
            group: "root".into(),
            size: 10,
            mode: 0o100_644,
            inode: 1,
            device: 2,
            mtime: 3,
            digest: "d41d8cd98f00b204e9800998ecf8427e".into(),
            link_target: String::new(),
            lang: String::new(),
        }
    }

    fn array_len(set: &TagSet, id: u32) -> usize {
        match &set.get(id).unwrap().value {
            TagValue::StrArray(v) => v.len(),
            TagValue::I16(v) => v.len(),
            TagValue::I32(v) => v.len(),
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn file_arrays_are_parallel() {
        let records = vec![
            record("opt/app", FileKind::Directory),
            record("opt/app/init.lua", FileKind::Regular),
            record("opt/app/conf.yml", FileKind::Regular),
        ];
        let set = build_header(&ctx(), &records);

        for id in [
            tags::FILESIZES,
            tags::FILEMODES,
            tags::FILERDEVS,
            tags::FILEMTIMES,
            tags::FILEDIGESTS,
            tags::FILELINKTOS,
            tags::FILEFLAGS,
            tags::FILEUSERNAME,
            tags::FILEGROUPNAME,
            tags::FILEDEVICES,
            tags::FILEINODES,
            tags::FILELANGS,
            tags::DIRINDEXES,
            tags::BASENAMES,
        ] {
            assert_eq!(array_len(&set, id), records.len(), "tag {id}");
        }
        assert_eq!(array_len(&set, tags::DIRNAMES), 2);
        assert!(tpack_schema::encode(&set, tags::HEADER_IMMUTABLE).is_ok());
    }

    #[test]
    fn file_flags_tell_directories_from_content() {
        let records = vec![
            record("d", FileKind::Directory),
            record("d/f", FileKind::Regular),
            record("d/l", FileKind::Symlink),
        ];
        let set = build_header(&ctx(), &records);

        let TagValue::I32(flags) = &set.get(tags::FILEFLAGS).unwrap().value else {
            panic!("FILEFLAGS is not an int32 array");
        };
        assert_eq!(flags, &vec![FILE_FLAG_DIRECTORY, FILE_FLAG_CONTENT, FILE_FLAG_CONTENT]);
        assert_ne!(flags[0], flags[1]);
    }

    #[test]
    fn requires_are_flattened() {
        let req = Requires::from_context(&ctx());
        assert_eq!(
            req.names,
            vec![
                "rpmlib(CompressedFileNames)",
                "rpmlib(PayloadFilesHavePrefix)",
                "tarantool",
                "tarantool",
                "unzip",
            ]
        );
        assert_eq!(&req.flags[2..], &[12, 2, 0]);
        assert_eq!(&req.versions[2..], &["1.10", "3", ""]);
        assert_eq!(req.flags[0], (1 << 24) | 10);
    }

    #[test]
    fn scripts_carry_bootstrap_and_user_body() {
        let mut ctx = ctx();
        ctx.postinst = Some("echo done".to_string());
        let set = build_header(&ctx, &[]);

        let TagValue::Str(prein) = &set.get(tags::PREIN).unwrap().value else {
            panic!("PREIN is not a string");
        };
        assert_eq!(prein, PREINST_BOOTSTRAP);
        let TagValue::Str(postin) = &set.get(tags::POSTIN).unwrap().value else {
            panic!("POSTIN is not a string");
        };
        assert!(postin.starts_with(POSTINST_BOOTSTRAP));
        assert!(postin.ends_with("\necho done"));
    }

    #[test]
    fn empty_bundle_omits_file_arrays() {
        let set = build_header(&ctx(), &[]);
        assert!(set.get(tags::BASENAMES).is_none());
        assert!(set.get(tags::FILESIZES).is_none());
        assert_eq!(
            set.get(tags::SOURCERPM).unwrap().value,
            TagValue::Str("myapp-1.2.3-4.src.rpm".into())
        );
    }
}
