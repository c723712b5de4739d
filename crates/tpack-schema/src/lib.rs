//! Shared types and wire format for tpack.
//!
//! This crate holds everything that is pure data: the typed header tags and
//! their binary codec, the dependency constraint grammar, target
//! architectures, and digest newtypes. Nothing here touches the filesystem
//! except [`Md5Hex::compute_file`].

pub mod arch;
pub mod codec;
pub mod dependency;
pub mod hash;
pub mod tag;

// Re-exports
pub use arch::*;
pub use codec::{EncodingError, HeaderIndex, IndexEntry, encode, pack_tag, read_index};
pub use dependency::{
    DepRelation, Dependency, DependencyFormatError, Operator, parse_dependencies,
    parse_dependency,
};
pub use hash::*;
pub use tag::{PackedTag, Tag, TagSet, TagType, TagValue};
