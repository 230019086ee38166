//! Compressed stream layer

use std::io::SeekFrom;

use tracing::{debug, trace};

use crate::error::{VfsError, VfsResult};
use crate::spec::CompressionMethod;
use crate::stream::cursor::ReplayCursor;
use crate::stream::{resolve_seek, SharedStream, VfsStream};
use crate::transform::InflateTransform;

/// Random-access view of a compressed payload
///
/// Seeking only moves the logical offset. The next read realigns the
/// underlying inflate by replaying it from the parent's start when the
/// offset moved backwards; the parent stream is never touched by `seek`
/// itself.
pub struct CompressedStream {
    parent: SharedStream,
    method: CompressionMethod,
    cursor: Option<ReplayCursor>,
    current_offset: u64,
    needs_realign: bool,
    size: Option<u64>,
}

impl CompressedStream {
    pub fn new(parent: SharedStream, method: CompressionMethod) -> Self {
        Self {
            parent,
            method,
            cursor: None,
            current_offset: 0,
            needs_realign: false,
            size: None,
        }
    }

    /// Pre-set the uncompressed size, skipping the measuring pass
    pub fn set_size(&mut self, size: u64) -> VfsResult<()> {
        if self.cursor.is_some() {
            return Err(VfsError::AlreadyOpen);
        }
        self.size = Some(size);
        Ok(())
    }
}

impl VfsStream for CompressedStream {
    fn open(&mut self) -> VfsResult<()> {
        if self.cursor.is_some() {
            return Err(VfsError::AlreadyOpen);
        }
        if !self.parent.borrow().is_open() {
            return Err(VfsError::NotOpen);
        }
        let transform = Box::new(InflateTransform::for_method(self.method));
        let mut cursor = ReplayCursor::new(self.parent.clone(), transform);
        cursor.reset()?;
        self.cursor = Some(cursor);
        self.current_offset = 0;
        self.needs_realign = false;
        debug!(method = self.method.as_str(), "opened compressed stream");
        Ok(())
    }

    fn close(&mut self) -> VfsResult<()> {
        if self.cursor.take().is_none() {
            return Err(VfsError::NotOpen);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    fn read(&mut self, size: usize) -> VfsResult<Vec<u8>> {
        let cursor = self.cursor.as_mut().ok_or(VfsError::NotOpen)?;
        if self.needs_realign {
            trace!(offset = self.current_offset, "realigning inflate");
            cursor.advance_to(self.current_offset)?;
            self.needs_realign = false;
        }
        let data = cursor.read(size)?;
        self.current_offset += data.len() as u64;
        Ok(data)
    }

    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        if self.cursor.is_none() {
            return Err(VfsError::NotOpen);
        }
        // End-relative targets need the logical size
        let size = match pos {
            SeekFrom::End(_) => self.size()?,
            _ => 0,
        };
        let target = resolve_seek(pos, self.current_offset, size)?;
        if target != self.current_offset {
            self.current_offset = target;
            self.needs_realign = true;
        }
        Ok(self.current_offset)
    }

    fn offset(&self) -> VfsResult<u64> {
        if self.cursor.is_none() {
            return Err(VfsError::NotOpen);
        }
        Ok(self.current_offset)
    }

    fn size(&mut self) -> VfsResult<u64> {
        let cursor = self.cursor.as_mut().ok_or(VfsError::NotOpen)?;
        if let Some(size) = self.size {
            return Ok(size);
        }
        let total = cursor.total()?;
        // The measuring pass left the cursor at the end; the next read must
        // replay to the logical offset.
        self.needs_realign = true;
        self.size = Some(total);
        debug!(size = total, "measured uncompressed size");
        Ok(total)
    }
}
