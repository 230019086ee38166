//! Host file system stream

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::error::{VfsError, VfsResult};
use crate::stream::{resolve_seek, VfsStream};

/// Stream over a single host file
pub struct OsStream {
    location: String,
    file: Option<File>,
    size: u64,
    offset: u64,
}

impl OsStream {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            file: None,
            size: 0,
            offset: 0,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl VfsStream for OsStream {
    fn open(&mut self) -> VfsResult<()> {
        if self.file.is_some() {
            return Err(VfsError::AlreadyOpen);
        }
        let file = File::open(&self.location)?;
        self.size = file.metadata()?.len();
        self.offset = 0;
        self.file = Some(file);
        debug!(location = %self.location, size = self.size, "opened OS stream");
        Ok(())
    }

    fn close(&mut self) -> VfsResult<()> {
        if self.file.take().is_none() {
            return Err(VfsError::NotOpen);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn read(&mut self, size: usize) -> VfsResult<Vec<u8>> {
        let file = self.file.as_mut().ok_or(VfsError::NotOpen)?;
        if size == 0 || self.offset >= self.size {
            return Ok(Vec::new());
        }
        let available = (self.size - self.offset).min(size as u64) as usize;
        file.seek(SeekFrom::Start(self.offset))?;

        let mut buf = vec![0u8; available];
        let mut filled = 0;
        while filled < available {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        self.offset += filled as u64;
        Ok(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        if self.file.is_none() {
            return Err(VfsError::NotOpen);
        }
        self.offset = resolve_seek(pos, self.offset, self.size)?;
        Ok(self.offset)
    }

    fn offset(&self) -> VfsResult<u64> {
        if self.file.is_none() {
            return Err(VfsError::NotOpen);
        }
        Ok(self.offset)
    }

    fn size(&mut self) -> VfsResult<u64> {
        if self.file.is_none() {
            return Err(VfsError::NotOpen);
        }
        Ok(self.size)
    }
}
