//! Byte window over a parent stream

use std::io::SeekFrom;

use tracing::trace;

use crate::error::{VfsError, VfsResult};
use crate::stream::{resolve_seek, SharedStream, VfsStream};

/// Presents `[range_offset, range_offset + range_size)` of the parent as a
/// stream of its own
///
/// Reads clamp to the window and to the parent's actual end; the logical
/// size is fixed at `range_size`.
pub struct DataRangeStream {
    parent: SharedStream,
    range_offset: u64,
    range_size: u64,
    offset: u64,
    open: bool,
}

impl DataRangeStream {
    pub fn new(parent: SharedStream, range_offset: u64, range_size: u64) -> Self {
        Self {
            parent,
            range_offset,
            range_size,
            offset: 0,
            open: false,
        }
    }
}

impl VfsStream for DataRangeStream {
    fn open(&mut self) -> VfsResult<()> {
        if self.open {
            return Err(VfsError::AlreadyOpen);
        }
        if !self.parent.borrow().is_open() {
            return Err(VfsError::NotOpen);
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
        let remaining = self.range_size.saturating_sub(self.offset);
        let to_read = remaining.min(size as u64) as usize;
        if to_read == 0 {
            return Ok(Vec::new());
        }

        let mut parent = self.parent.borrow_mut();
        parent.seek(SeekFrom::Start(self.range_offset + self.offset))?;
        let data = parent.read(to_read)?;
        trace!(
            window_offset = self.offset,
            requested = to_read,
            got = data.len(),
            "range read"
        );
        self.offset += data.len() as u64;
        Ok(data)
    }

    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        if !self.open {
            return Err(VfsError::NotOpen);
        }
        self.offset = resolve_seek(pos, self.offset, self.range_size)?;
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
        Ok(self.range_size)
    }
}
