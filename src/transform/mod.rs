//! Forward-only byte transforms
//!
//! A transform consumes parent-stream bytes and emits logical-stream bytes.
//! It only ever runs forward; random access is layered on top by replaying
//! from the parent's start (see `stream::cursor`).

pub mod decompress;
pub mod decrypt;

pub use decompress::InflateTransform;
pub use decrypt::Rc4Transform;

use crate::error::VfsResult;

pub(crate) trait StreamTransform {
    /// Return to the pristine state, ready to consume from offset 0
    fn reset(&mut self);

    /// Consume parent bytes, emit transformed bytes
    ///
    /// May emit nothing while the transform accumulates input; input past a
    /// self-terminating end of stream is ignored.
    fn process(&mut self, input: &[u8]) -> VfsResult<Vec<u8>>;

    /// Flush held-back output at the end of parent data
    fn finish(&mut self) -> VfsResult<Vec<u8>>;

    /// True once the transform will emit no further output
    fn finished(&self) -> bool;
}
