//! In-memory stream
//!
//! Backs fixtures and synthesized payloads that never touch the host file
//! system; behaves exactly like any other stream object.

use std::io::SeekFrom;

use crate::error::{VfsError, VfsResult};
use crate::stream::{resolve_seek, VfsStream};

pub struct MemoryStream {
    data: Vec<u8>,
    offset: u64,
    open: bool,
}

impl MemoryStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            offset: 0,
            open: false,
        }
    }
}

impl VfsStream for MemoryStream {
    fn open(&mut self) -> VfsResult<()> {
        if self.open {
            return Err(VfsError::AlreadyOpen);
        }
        self.open = true;
        self.offset = 0;
        Ok(())
    }

    fn close(&mut self) -> VfsResult<()> {
        if !self.open {
            return Err(VfsError::NotOpen);
        }
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self, size: usize) -> VfsResult<Vec<u8>> {
        if !self.open {
            return Err(VfsError::NotOpen);
        }
        let len = self.data.len() as u64;
        if size == 0 || self.offset >= len {
            return Ok(Vec::new());
        }
        let start = self.offset as usize;
        let end = (self.offset + size as u64).min(len) as usize;
        self.offset = end as u64;
        Ok(self.data[start..end].to_vec())
    }

    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        if !self.open {
            return Err(VfsError::NotOpen);
        }
        self.offset = resolve_seek(pos, self.offset, self.data.len() as u64)?;
        Ok(self.offset)
    }

    fn offset(&self) -> VfsResult<u64> {
        if !self.open {
            return Err(VfsError::NotOpen);
        }
        Ok(self.offset)
    }

    fn size(&mut self) -> VfsResult<u64> {
        if !self.open {
            return Err(VfsError::NotOpen);
        }
        Ok(self.data.len() as u64)
    }
}
