//! CPIO on-disk structures and constants

use serde::Serialize;

// =============================================================================
// Signatures
// =============================================================================

/// Binary-format magic, 0o070707 in the archive's own byte order
pub const CPIO_BIN_MAGIC: u16 = 0o070707;
/// Portable ASCII (odc) magic
pub const CPIO_ODC_MAGIC: &[u8; 6] = b"070707";
/// New ASCII (newc) magic
pub const CPIO_NEWC_MAGIC: &[u8; 6] = b"070701";
/// New ASCII with checksum (crc) magic
pub const CPIO_CRC_MAGIC: &[u8; 6] = b"070702";

/// Terminator record name
pub const CPIO_TRAILER: &str = "TRAILER!!!";

pub(crate) const CPIO_BIN_HEADER_LEN: u64 = 26;
pub(crate) const CPIO_ODC_HEADER_LEN: u64 = 76;
pub(crate) const CPIO_NEWC_HEADER_LEN: u64 = 110;

// =============================================================================
// Archive Variants
// =============================================================================

/// Archive variant, named after the classic cpio(1) write options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CpioFormat {
    #[serde(rename = "bin-little-endian")]
    BinaryLittleEndian,
    #[serde(rename = "bin-big-endian")]
    BinaryBigEndian,
    #[serde(rename = "odc")]
    PortableAscii,
    #[serde(rename = "newc")]
    NewAscii,
    #[serde(rename = "crc")]
    NewAsciiCrc,
}

impl CpioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CpioFormat::BinaryLittleEndian => "bin-little-endian",
            CpioFormat::BinaryBigEndian => "bin-big-endian",
            CpioFormat::PortableAscii => "odc",
            CpioFormat::NewAscii => "newc",
            CpioFormat::NewAsciiCrc => "crc",
        }
    }

}

// =============================================================================
// Archive Members
// =============================================================================

/// One archive member
///
/// `size` is the full on-disk record length including header, name, data and
/// alignment padding, so `record offset + size` is the next record's offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpioEntry {
    pub path: String,
    pub data_offset: u64,
    pub data_size: u64,
    pub inode: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: i64,
    pub size: u64,
}

impl CpioEntry {
    pub fn is_regular_file(&self) -> bool {
        self.mode & 0o170000 == 0o100000
    }

    pub fn is_directory(&self) -> bool {
        self.mode & 0o170000 == 0o040000
    }
}
