//! Inflate transform over the incremental flate2 decompressor

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::{VfsError, VfsResult};
use crate::spec::CompressionMethod;
use crate::transform::StreamTransform;

/// Output space reserved per inflate step
const INFLATE_STEP: usize = 32 * 1024;

/// Streaming inflate for zlib containers and raw deflate data
///
/// Uses the low-level `Decompress` context so input can arrive in arbitrary
/// chunks and the context can be rewound for replay.
pub struct InflateTransform {
    ctx: Decompress,
    zlib_header: bool,
    done: bool,
}

impl InflateTransform {
    pub fn zlib() -> Self {
        Self {
            ctx: Decompress::new(true),
            zlib_header: true,
            done: false,
        }
    }

    pub fn deflate() -> Self {
        Self {
            ctx: Decompress::new(false),
            zlib_header: false,
            done: false,
        }
    }

    pub fn for_method(method: CompressionMethod) -> Self {
        match method {
            CompressionMethod::Zlib => Self::zlib(),
            CompressionMethod::Deflate => Self::deflate(),
        }
    }
}

impl StreamTransform for InflateTransform {
    fn reset(&mut self) {
        self.ctx.reset(self.zlib_header);
        self.done = false;
    }

    fn process(&mut self, input: &[u8]) -> VfsResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut consumed = 0usize;
        while consumed < input.len() && !self.done {
            out.reserve(INFLATE_STEP);
            let before_in = self.ctx.total_in();
            let before_len = out.len();

            let status = self
                .ctx
                .decompress_vec(&input[consumed..], &mut out, FlushDecompress::None)
                .map_err(|e| VfsError::Malformed {
                    format: "deflate",
                    message: e.to_string(),
                })?;
            consumed += (self.ctx.total_in() - before_in) as usize;

            if status == Status::StreamEnd {
                // Parent bytes past the end of stream are trailing data and
                // are ignored.
                self.done = true;
            } else if consumed < input.len()
                && self.ctx.total_in() == before_in
                && out.len() == before_len
            {
                return Err(VfsError::Malformed {
                    format: "deflate",
                    message: "inflate made no progress".to_string(),
                });
            }
        }
        Ok(out)
    }

    fn finish(&mut self) -> VfsResult<Vec<u8>> {
        // Inflation emits eagerly; a stream truncated before its end marker
        // simply yields what was recoverable.
        self.done = true;
        Ok(Vec::new())
    }

    fn finished(&self) -> bool {
        self.done
    }
}
