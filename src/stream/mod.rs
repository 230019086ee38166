//! Stream objects and their lifecycle
//!
//! Every layer of a resolved chain materializes as a `VfsStream`: a
//! readable, seekable byte stream with an explicit Closed -> Open -> Closed
//! state machine. Handles are shared via `Rc<RefCell<...>>`: reference
//! counted, single-threaded, never locked.

pub mod compressed;
pub(crate) mod cursor;
pub mod encrypted;
pub mod memory;
pub mod os;
pub mod range;
pub mod segmented;

pub use compressed::CompressedStream;
pub use encrypted::EncryptedStream;
pub use memory::MemoryStream;
pub use os::OsStream;
pub use range::DataRangeStream;
pub use segmented::SegmentedStream;

use std::cell::RefCell;
use std::io::SeekFrom;
use std::rc::Rc;

use crate::error::{VfsError, VfsResult};

/// Shared handle to a stream object
pub type SharedStream = Rc<RefCell<dyn VfsStream>>;

/// Readable, seekable stream over one layer of a path specification chain
///
/// Streams are constructed closed. Every operation except `open` fails with
/// `NotOpen` until `open` succeeds; `close` returns the stream to the closed
/// state, after which it may be opened again.
pub trait VfsStream {
    fn open(&mut self) -> VfsResult<()>;
    fn close(&mut self) -> VfsResult<()>;
    fn is_open(&self) -> bool;

    /// Read up to `size` bytes from the current offset
    ///
    /// Returns fewer bytes near the end of the stream and an empty vector at
    /// or past it; advances the offset by the returned length.
    fn read(&mut self, size: usize) -> VfsResult<Vec<u8>>;

    /// POSIX seek
    ///
    /// Seeking past the end is legal (subsequent reads return empty); a
    /// negative effective offset is `InvalidOffset` and leaves the stream
    /// offset unchanged. Returns the new offset.
    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64>;

    fn offset(&self) -> VfsResult<u64>;

    /// Logical size; transform-backed streams may compute this on first use
    fn size(&mut self) -> VfsResult<u64>;

    /// Read from the current offset to the end of the stream
    fn read_to_end(&mut self) -> VfsResult<Vec<u8>> {
        let size = self.size()?;
        let offset = self.offset()?;
        let remaining = size.saturating_sub(offset);
        self.read(remaining as usize)
    }
}

/// Wrap a stream for shared use
pub fn share<S: VfsStream + 'static>(stream: S) -> SharedStream {
    Rc::new(RefCell::new(stream))
}

/// Resolve a `SeekFrom` against the current offset and total size
///
/// Callers assign the result only on success, so a failed seek leaves their
/// offset untouched.
pub(crate) fn resolve_seek(pos: SeekFrom, current: u64, size: u64) -> VfsResult<u64> {
    let target: i128 = match pos {
        SeekFrom::Start(offset) => offset as i128,
        SeekFrom::Current(delta) => current as i128 + delta as i128,
        SeekFrom::End(delta) => size as i128 + delta as i128,
    };
    if target < 0 || target > u64::MAX as i128 {
        return Err(VfsError::InvalidOffset {
            offset: target.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
        });
    }
    Ok(target as u64)
}
