//! RC4 stream decryption
//!
//! Implemented in-crate: the keystream setup (KSA) and generator (PRGA) are
//! a few lines each, and the transform needs rewind support that wraps
//! naturally around the raw state.

use crate::error::{VfsError, VfsResult};
use crate::transform::StreamTransform;

pub struct Rc4Transform {
    key: Vec<u8>,
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4Transform {
    pub fn new(key: &[u8]) -> VfsResult<Self> {
        if key.is_empty() {
            return Err(VfsError::BadAttributes {
                kind: "ENCRYPTED_STREAM".to_string(),
                message: "empty key".to_string(),
            });
        }
        let mut transform = Self {
            key: key.to_vec(),
            state: [0; 256],
            i: 0,
            j: 0,
        };
        transform.schedule();
        Ok(transform)
    }

    /// Key scheduling: permute the state from the key bytes
    fn schedule(&mut self) {
        for (idx, slot) in self.state.iter_mut().enumerate() {
            *slot = idx as u8;
        }
        let mut j = 0u8;
        for i in 0..256 {
            j = j
                .wrapping_add(self.state[i])
                .wrapping_add(self.key[i % self.key.len()]);
            self.state.swap(i, j as usize);
        }
        self.i = 0;
        self.j = 0;
    }
}

impl StreamTransform for Rc4Transform {
    fn reset(&mut self) {
        self.schedule();
    }

    fn process(&mut self, input: &[u8]) -> VfsResult<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        for &byte in input {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.state[self.i as usize]);
            self.state.swap(self.i as usize, self.j as usize);
            let sum = self.state[self.i as usize] as usize + self.state[self.j as usize] as usize;
            out.push(byte ^ self.state[sum % 256]);
        }
        Ok(out)
    }

    fn finish(&mut self) -> VfsResult<Vec<u8>> {
        // Stream cipher; nothing is held back
        Ok(Vec::new())
    }

    fn finished(&self) -> bool {
        // Length-preserving and never self-terminating; the parent's end is
        // the stream's end
        false
    }
}
