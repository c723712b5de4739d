pub mod archive;
pub mod collect;
pub mod config;
pub mod context;
pub mod deb;
pub mod deps;
pub mod error;
pub mod io;
pub mod layout;
pub mod pack;
pub mod payload;
pub mod rpm;
pub mod runtime;
pub mod scripts;
pub mod tgz;
pub mod version;

pub use config::{ConfigError, PackConfig};
pub use context::{Ownership, PackContext};
pub use error::{IoResultExt, PackError};
pub use layout::Layout;
pub use pack::{Format, pack};
pub use payload::{CpioGzArchiver, Payload, PayloadArchiver};
pub use version::PackageVersion;
