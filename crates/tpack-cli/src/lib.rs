//! tpack - package a prepared application bundle
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Builds RPM, DEB and plain tarball packages from a directory whose tree is
//! exactly what should be installed on the target system.
//!
//! # Example
//!
//! ```text
//! tpack pack ./bundle --type rpm,deb --name myapp --version 1.2.3-4 \
//!     --dep "tarantool >= 1.10, < 3" --output-dir dist
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tpack_core::{Format, PackConfig};

#[derive(Debug, Parser)]
#[command(name = "tpack")]
#[command(author, version, about = "tpack - build RPM, DEB and TGZ packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build packages from a bundle directory
    Pack(PackArgs),
    /// Work with dependency files
    Deps {
        #[command(subcommand)]
        command: DepsCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum DepsCommands {
    /// Parse a dependency file and print the canonical form of every line
    Check {
        /// Path to the dependency file
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PackArgs {
    /// Directory whose contents map to `/` on the target
    pub bundle_dir: PathBuf,

    /// Package types to build, comma separated (rpm, deb, tgz)
    #[arg(long = "type", short = 't', value_delimiter = ',', default_value = "rpm")]
    pub types: Vec<Format>,

    /// pack.toml with default settings
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Package name
    #[arg(long)]
    pub name: Option<String>,

    /// Version, e.g. 1.2.3 or 1.2.3-4-g1a2b3c4
    #[arg(long)]
    pub version: Option<String>,

    /// Override the release number
    #[arg(long)]
    pub release: Option<String>,

    /// Target architecture (x86_64/amd64, aarch64/arm64)
    #[arg(long)]
    pub arch: Option<String>,

    /// Dependency line, e.g. "tarantool >= 1.10, < 3" (repeatable)
    #[arg(long = "dep")]
    pub deps: Vec<String>,

    /// File with one dependency per line
    #[arg(long)]
    pub deps_file: Option<PathBuf>,

    /// Program whose installed version becomes an exact dependency (repeatable)
    #[arg(long = "runtime-dep")]
    pub runtime_deps: Vec<String>,

    /// Pre-install script
    #[arg(long)]
    pub preinst: Option<PathBuf>,

    /// Post-install script
    #[arg(long)]
    pub postinst: Option<PathBuf>,

    /// Where finished packages are written
    #[arg(long, short = 'o', default_value = ".")]
    pub output_dir: PathBuf,

    /// Parent directory for scratch files (defaults to the system temp dir)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,
}

impl PackArgs {
    /// Flag values as a config layer for [`PackConfig::overlay`].
    pub fn to_config(&self) -> PackConfig {
        PackConfig {
            name: self.name.clone(),
            version: self.version.clone(),
            release: self.release.clone(),
            arch: self.arch.clone(),
            deps: self.deps.clone(),
            deps_file: self.deps_file.clone(),
            preinst: self.preinst.clone(),
            postinst: self.postinst.clone(),
            runtime_deps: self.runtime_deps.clone(),
            ..PackConfig::default()
        }
    }

    /// Requested formats, first occurrence wins.
    pub fn formats(&self) -> Vec<Format> {
        let mut formats = Vec::new();
        for format in &self.types {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        formats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pack_flags() {
        let cli = Cli::parse_from([
            "tpack",
            "pack",
            "bundle",
            "--type",
            "rpm,deb,rpm",
            "--name",
            "myapp",
            "--dep",
            "tarantool>=1.10",
            "--dep",
            "unzip",
        ]);
        let Commands::Pack(args) = cli.command else {
            panic!("expected pack");
        };
        assert_eq!(args.formats(), vec![Format::Rpm, Format::Deb]);
        assert_eq!(args.output_dir, PathBuf::from("."));

        let config = args.to_config();
        assert_eq!(config.name.as_deref(), Some("myapp"));
        assert_eq!(config.deps, vec!["tarantool>=1.10", "unzip"]);
        assert_eq!(config.license, None);
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(Cli::try_parse_from(["tpack", "pack", "b", "--type", "docker"]).is_err());
    }
}
