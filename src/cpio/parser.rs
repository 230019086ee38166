//! CPIO archive parsing
//!
//! Walks the record chain from offset 0 to the trailer, covering the two
//! binary byte orders, portable ASCII (odc) and the two new ASCII variants
//! (newc, crc). Record sizes honor each variant's alignment rules, so the
//! walk is pure offset arithmetic over the parent stream.

use std::collections::HashMap;
use std::io::SeekFrom;

use tracing::{debug, warn};

use crate::cpio::types::{
    CpioEntry, CpioFormat, CPIO_BIN_HEADER_LEN, CPIO_BIN_MAGIC, CPIO_CRC_MAGIC,
    CPIO_NEWC_HEADER_LEN, CPIO_NEWC_MAGIC, CPIO_ODC_HEADER_LEN, CPIO_ODC_MAGIC, CPIO_TRAILER,
};
use crate::error::{VfsError, VfsResult};
use crate::stream::SharedStream;

/// Parsed archive over an open parent stream
pub struct CpioArchive {
    stream: SharedStream,
    format: CpioFormat,
    archive_size: u64,
    entries: Vec<CpioEntry>,
    index: HashMap<String, usize>,
}

impl CpioArchive {
    /// Detect the variant from the magic at offset 0 and scan all records
    ///
    /// The stream must be open. Duplicate paths after the first are skipped.
    pub fn open(stream: SharedStream) -> VfsResult<Self> {
        let archive_size = stream.borrow_mut().size()?;
        let mut archive = Self {
            stream,
            format: CpioFormat::PortableAscii,
            archive_size,
            entries: Vec::new(),
            index: HashMap::new(),
        };
        archive.format = archive.detect_format()?;
        archive.scan()?;
        debug!(
            format = archive.format.as_str(),
            entries = archive.entries.len(),
            size = archive_size,
            "opened cpio archive"
        );
        Ok(archive)
    }

    pub fn format(&self) -> CpioFormat {
        self.format
    }

    pub fn archive_size(&self) -> u64 {
        self.archive_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, path: &str) -> Option<&CpioEntry> {
        self.index.get(path).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Entries whose path starts with `prefix`, in archive order
    pub fn entries<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a CpioEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.path.starts_with(prefix))
    }

    /// Positional read on the underlying archive stream, independent of any
    /// entry object
    pub fn read_data_at(&mut self, offset: u64, size: usize) -> VfsResult<Vec<u8>> {
        let mut stream = self.stream.borrow_mut();
        stream.seek(SeekFrom::Start(offset))?;
        stream.read(size)
    }

    // =========================================================================
    // Record Walk
    // =========================================================================

    fn detect_format(&self) -> VfsResult<CpioFormat> {
        let probe_len = self.archive_size.min(6) as usize;
        let magic = self.read_exact(0, probe_len)?;
        if magic.starts_with(CPIO_NEWC_MAGIC) {
            return Ok(CpioFormat::NewAscii);
        }
        if magic.starts_with(CPIO_CRC_MAGIC) {
            return Ok(CpioFormat::NewAsciiCrc);
        }
        if magic.starts_with(CPIO_ODC_MAGIC) {
            return Ok(CpioFormat::PortableAscii);
        }
        if magic.len() >= 2 {
            let le = u16::from_le_bytes([magic[0], magic[1]]);
            let be = u16::from_be_bytes([magic[0], magic[1]]);
            if le == CPIO_BIN_MAGIC {
                return Ok(CpioFormat::BinaryLittleEndian);
            }
            if be == CPIO_BIN_MAGIC {
                return Ok(CpioFormat::BinaryBigEndian);
            }
        }
        Err(VfsError::BadSignature)
    }

    fn scan(&mut self) -> VfsResult<()> {
        let mut offset = 0u64;
        while offset < self.archive_size {
            let entry = self.read_entry_at(offset)?;
            offset += entry.size;
            if entry.path == CPIO_TRAILER {
                break;
            }
            if self.index.contains_key(&entry.path) {
                warn!(path = %entry.path, "duplicate path in archive, keeping first");
                continue;
            }
            self.index.insert(entry.path.clone(), self.entries.len());
            self.entries.push(entry);
        }
        Ok(())
    }

    fn read_entry_at(&self, offset: u64) -> VfsResult<CpioEntry> {
        let entry = match self.format {
            CpioFormat::BinaryLittleEndian => self.read_binary_entry(offset, true)?,
            CpioFormat::BinaryBigEndian => self.read_binary_entry(offset, false)?,
            CpioFormat::PortableAscii => self.read_odc_entry(offset)?,
            CpioFormat::NewAscii | CpioFormat::NewAsciiCrc => self.read_newc_entry(offset)?,
        };
        if entry
            .data_offset
            .checked_add(entry.data_size)
            .map_or(true, |end| end > self.archive_size)
        {
            return Err(VfsError::Malformed {
                format: "cpio",
                message: format!("record at offset {} overruns the archive", offset),
            });
        }
        Ok(entry)
    }

    /// Binary variant: 26-byte header of 13 words in the archive byte order;
    /// 32-bit values are two words, upper first; name and data pad to 2
    fn read_binary_entry(&self, offset: u64, little: bool) -> VfsResult<CpioEntry> {
        let header = self.read_exact(offset, CPIO_BIN_HEADER_LEN as usize)?;
        let word = |idx: usize| -> u64 {
            let pair = [header[idx * 2], header[idx * 2 + 1]];
            let value = if little {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            };
            value as u64
        };

        if word(0) != CPIO_BIN_MAGIC as u64 {
            return Err(self.record_error(offset, "bad record magic"));
        }
        let inode = word(2);
        let mode = word(3) as u32;
        let uid = word(4) as u32;
        let gid = word(5) as u32;
        let mtime = (word(8) << 16) | word(9);
        let namesize = word(10);
        let data_size = (word(11) << 16) | word(12);

        let mut cursor = offset + CPIO_BIN_HEADER_LEN;
        let path = self.read_name(cursor, namesize)?;
        cursor += namesize;
        cursor += cursor % 2;
        let data_offset = cursor;
        cursor += data_size;
        cursor += cursor % 2;

        Ok(CpioEntry {
            path,
            data_offset,
            data_size,
            inode,
            mode,
            uid,
            gid,
            mtime: mtime as i64,
            size: cursor - offset,
        })
    }

    /// Portable ASCII (odc): 76-byte header of fixed-width octal text, no
    /// alignment padding
    fn read_odc_entry(&self, offset: u64) -> VfsResult<CpioEntry> {
        let header = self.read_exact(offset, CPIO_ODC_HEADER_LEN as usize)?;
        if &header[0..6] != CPIO_ODC_MAGIC {
            return Err(self.record_error(offset, "bad record magic"));
        }
        let inode = parse_octal(&header[12..18])?;
        let mode = parse_octal(&header[18..24])? as u32;
        let uid = parse_octal(&header[24..30])? as u32;
        let gid = parse_octal(&header[30..36])? as u32;
        let mtime = parse_octal(&header[48..59])? as i64;
        let namesize = parse_octal(&header[59..65])?;
        let data_size = parse_octal(&header[65..76])?;

        let mut cursor = offset + CPIO_ODC_HEADER_LEN;
        let path = self.read_name(cursor, namesize)?;
        cursor += namesize;
        let data_offset = cursor;
        cursor += data_size;

        Ok(CpioEntry {
            path,
            data_offset,
            data_size,
            inode,
            mode,
            uid,
            gid,
            mtime,
            size: cursor - offset,
        })
    }

    /// New ASCII (newc/crc): 110-byte header of 8-digit hex text; name and
    /// data pad to 4-byte alignment of the absolute archive offset
    fn read_newc_entry(&self, offset: u64) -> VfsResult<CpioEntry> {
        let header = self.read_exact(offset, CPIO_NEWC_HEADER_LEN as usize)?;
        let expected: &[u8; 6] = match self.format {
            CpioFormat::NewAsciiCrc => CPIO_CRC_MAGIC,
            _ => CPIO_NEWC_MAGIC,
        };
        if &header[0..6] != expected {
            return Err(self.record_error(offset, "bad record magic"));
        }
        let field = |idx: usize| -> VfsResult<u64> {
            let start = 6 + idx * 8;
            parse_hex(&header[start..start + 8])
        };
        let inode = field(0)?;
        let mode = field(1)? as u32;
        let uid = field(2)? as u32;
        let gid = field(3)? as u32;
        let mtime = field(5)? as i64;
        let data_size = field(6)?;
        let namesize = field(11)?;

        let mut cursor = offset + CPIO_NEWC_HEADER_LEN;
        let path = self.read_name(cursor, namesize)?;
        cursor += namesize;
        cursor += pad4(cursor);
        let data_offset = cursor;
        cursor += data_size;
        cursor += pad4(cursor);

        Ok(CpioEntry {
            path,
            data_offset,
            data_size,
            inode,
            mode,
            uid,
            gid,
            mtime,
            size: cursor - offset,
        })
    }

    fn read_name(&self, offset: u64, namesize: u64) -> VfsResult<String> {
        if namesize == 0 {
            return Err(self.record_error(offset, "empty name field"));
        }
        let mut raw = self.read_exact(offset, namesize as usize)?;
        if raw.last() == Some(&0) {
            raw.pop();
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn read_exact(&self, offset: u64, size: usize) -> VfsResult<Vec<u8>> {
        let mut stream = self.stream.borrow_mut();
        stream.seek(SeekFrom::Start(offset))?;
        let data = stream.read(size)?;
        if data.len() != size {
            return Err(VfsError::Malformed {
                format: "cpio",
                message: format!("truncated record at offset {}", offset),
            });
        }
        Ok(data)
    }

    fn record_error(&self, offset: u64, message: &str) -> VfsError {
        VfsError::Malformed {
            format: "cpio",
            message: format!("{} at offset {}", message, offset),
        }
    }
}

fn pad4(offset: u64) -> u64 {
    (4 - (offset % 4)) % 4
}

fn parse_octal(field: &[u8]) -> VfsResult<u64> {
    let mut value = 0u64;
    for &byte in field {
        if !(b'0'..=b'7').contains(&byte) {
            return Err(VfsError::Malformed {
                format: "cpio",
                message: "invalid octal field".to_string(),
            });
        }
        value = value * 8 + (byte - b'0') as u64;
    }
    Ok(value)
}

fn parse_hex(field: &[u8]) -> VfsResult<u64> {
    let mut value = 0u64;
    for &byte in field {
        let digit = match byte {
            b'0'..=b'9' => (byte - b'0') as u64,
            b'a'..=b'f' => (byte - b'a' + 10) as u64,
            b'A'..=b'F' => (byte - b'A' + 10) as u64,
            _ => {
                return Err(VfsError::Malformed {
                    format: "cpio",
                    message: "invalid hex field".to_string(),
                })
            }
        };
        value = value * 16 + digit;
    }
    Ok(value)
}
