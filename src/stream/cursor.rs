//! Replayable cursor over a forward-only transform
//!
//! Decompression and decryption only run forward. Random access is layered
//! on top: the cursor tracks the logical position of the transform output,
//! and any target behind that position is reached by resetting the transform,
//! rewinding the parent to its start, and replaying.

use std::io::SeekFrom;

use tracing::trace;

use crate::error::VfsResult;
use crate::stream::SharedStream;
use crate::transform::StreamTransform;

/// Parent bytes pulled per step
pub(crate) const PULL_CHUNK: usize = 32 * 1024;

/// Buffered prefix tolerated before compaction
const COMPACT_THRESHOLD: usize = 64 * 1024;

pub(crate) struct ReplayCursor {
    parent: SharedStream,
    transform: Box<dyn StreamTransform>,
    buffer: Vec<u8>,
    buffer_start: usize,
    /// Logical offset of `buffer[buffer_start]`
    position: u64,
    source_done: bool,
}

impl ReplayCursor {
    pub fn new(parent: SharedStream, transform: Box<dyn StreamTransform>) -> Self {
        Self {
            parent,
            transform,
            buffer: Vec::new(),
            buffer_start: 0,
            position: 0,
            source_done: false,
        }
    }

    fn buffered(&self) -> usize {
        self.buffer.len() - self.buffer_start
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Back to logical offset 0: pristine transform, parent rewound, buffer
    /// dropped. Idempotent.
    pub fn reset(&mut self) -> VfsResult<()> {
        self.transform.reset();
        self.parent.borrow_mut().seek(SeekFrom::Start(0))?;
        self.buffer.clear();
        self.buffer_start = 0;
        self.position = 0;
        self.source_done = false;
        Ok(())
    }

    /// Pull one parent chunk through the transform into the buffer
    ///
    /// Flushes the transform when the parent is exhausted; afterwards
    /// `source_done` holds and the buffer contains everything there is.
    fn fill(&mut self) -> VfsResult<()> {
        if self.source_done {
            return Ok(());
        }
        if self.transform.finished() {
            self.source_done = true;
            return Ok(());
        }
        let chunk = self.parent.borrow_mut().read(PULL_CHUNK)?;
        if chunk.is_empty() {
            let tail = self.transform.finish()?;
            self.buffer.extend_from_slice(&tail);
            self.source_done = true;
        } else {
            let out = self.transform.process(&chunk)?;
            self.buffer.extend_from_slice(&out);
        }
        Ok(())
    }

    /// Position the cursor at `target`, replaying from the start when the
    /// target lies behind the current position. Stops early at end of
    /// stream.
    pub fn advance_to(&mut self, target: u64) -> VfsResult<()> {
        if target < self.position {
            trace!(target, position = self.position, "replaying transform");
            self.reset()?;
        }
        while self.position < target {
            if self.buffered() == 0 {
                if self.source_done {
                    break;
                }
                self.fill()?;
                continue;
            }
            let skip = ((target - self.position) as usize).min(self.buffered());
            self.buffer_start += skip;
            self.position += skip as u64;
            self.compact();
        }
        Ok(())
    }

    /// Read up to `size` transformed bytes at the cursor position
    pub fn read(&mut self, size: usize) -> VfsResult<Vec<u8>> {
        while self.buffered() < size && !self.source_done {
            self.fill()?;
        }
        let take = size.min(self.buffered());
        let out = self.buffer[self.buffer_start..self.buffer_start + take].to_vec();
        self.buffer_start += take;
        self.position += take as u64;
        self.compact();
        Ok(out)
    }

    /// Transformed length of the whole stream; leaves the cursor at the end
    pub fn total(&mut self) -> VfsResult<u64> {
        self.reset()?;
        loop {
            let len = self.buffered();
            if len > 0 {
                self.buffer_start += len;
                self.position += len as u64;
                self.compact();
            }
            if self.source_done {
                break;
            }
            self.fill()?;
        }
        Ok(self.position)
    }

    fn compact(&mut self) {
        if self.buffer_start == self.buffer.len() {
            self.buffer.clear();
            self.buffer_start = 0;
        } else if self.buffer_start >= COMPACT_THRESHOLD {
            self.buffer.drain(..self.buffer_start);
            self.buffer_start = 0;
        }
    }
}
