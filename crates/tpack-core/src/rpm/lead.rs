//! The 96-byte legacy lead at the start of every RPM file.

use tpack_schema::Arch;

/// Size of the lead in bytes.
pub const LEAD_SIZE: usize = 96;

const LEAD_MAGIC: [u8; 4] = [0xed, 0xab, 0xee, 0xdb];
const MAJOR: u8 = 3;
const MINOR: u8 = 0;
const TYPE_BINARY: u16 = 0;
const OS_LINUX: u16 = 1;
const SIGTYPE_HEADERSIG: u16 = 5;
const NAME_OFFSET: usize = 10;
const NAME_LEN: usize = 66;

/// Lead block. Only the name and architecture vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    name: String,
    arch: Arch,
}

impl Lead {
    /// Lead for package `name` (usually `name-version-release`).
    pub fn new(name: impl Into<String>, arch: Arch) -> Self {
        Self {
            name: name.into(),
            arch,
        }
    }

    /// Serialize. Names longer than 65 bytes are truncated so the field
    /// stays NUL-terminated.
    pub fn to_bytes(&self) -> [u8; LEAD_SIZE] {
        let mut out = [0u8; LEAD_SIZE];
        out[0..4].copy_from_slice(&LEAD_MAGIC);
        out[4] = MAJOR;
        out[5] = MINOR;
        out[6..8].copy_from_slice(&TYPE_BINARY.to_be_bytes());
        out[8..10].copy_from_slice(&self.arch.rpm_archnum().to_be_bytes());

        let name = self.name.as_bytes();
        let len = name.len().min(NAME_LEN - 1);
        out[NAME_OFFSET..NAME_OFFSET + len].copy_from_slice(&name[..len]);

        let tail = NAME_OFFSET + NAME_LEN;
        out[tail..tail + 2].copy_from_slice(&OS_LINUX.to_be_bytes());
        out[tail + 2..tail + 4].copy_from_slice(&SIGTYPE_HEADERSIG.to_be_bytes());
        // remaining 16 bytes reserved
        out
    }
}
