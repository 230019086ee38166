//! Concatenation of ordered segment streams
//!
//! Multi-segment forensic images present as one logical stream; reads span
//! segment boundaries transparently.

use std::io::SeekFrom;

use tracing::debug;

use crate::error::{VfsError, VfsResult};
use crate::stream::{resolve_seek, SharedStream, VfsStream};

pub struct SegmentedStream {
    segments: Vec<SharedStream>,
    segment_sizes: Vec<u64>,
    total_size: u64,
    offset: u64,
    open: bool,
}

impl SegmentedStream {
    /// Segments must already be open; sizes are captured when this stream
    /// opens.
    pub fn new(segments: Vec<SharedStream>) -> Self {
        Self {
            segments,
            segment_sizes: Vec::new(),
            total_size: 0,
            offset: 0,
            open: false,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Convert a global position to (segment index, offset within segment)
    fn locate(&self, pos: u64) -> (usize, u64) {
        let mut local = pos;
        for (idx, &size) in self.segment_sizes.iter().enumerate() {
            if local < size {
                return (idx, local);
            }
            local -= size;
        }
        let last = self.segments.len().saturating_sub(1);
        (last, *self.segment_sizes.last().unwrap_or(&0))
    }
}

impl VfsStream for SegmentedStream {
    fn open(&mut self) -> VfsResult<()> {
        if self.open {
            return Err(VfsError::AlreadyOpen);
        }
        let mut sizes = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            sizes.push(segment.borrow_mut().size()?);
        }
        self.total_size = sizes.iter().sum();
        self.segment_sizes = sizes;
        self.offset = 0;
        self.open = true;
        debug!(
            segment_count = self.segments.len(),
            total_size = self.total_size,
            "opened segmented stream"
        );
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
        let mut collected = Vec::new();
        while collected.len() < size && self.offset < self.total_size {
            let (idx, local) = self.locate(self.offset);
            let segment_remaining = self.segment_sizes[idx] - local;
            let to_read = (size - collected.len()).min(segment_remaining as usize);

            let mut segment = self.segments[idx].borrow_mut();
            segment.seek(SeekFrom::Start(local))?;
            let data = segment.read(to_read)?;
            if data.is_empty() {
                break;
            }
            self.offset += data.len() as u64;
            collected.extend_from_slice(&data);
        }
        Ok(collected)
    }

    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        if !self.open {
            return Err(VfsError::NotOpen);
        }
        self.offset = resolve_seek(pos, self.offset, self.total_size)?;
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
        Ok(self.total_size)
    }
}
