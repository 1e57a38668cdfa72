//! MSB-first bit stream over `bitvec`.

use crate::error::{ChunkError, Result};
use bitvec::prelude::*;

/// Append-only bit sink used by the encoders.
#[derive(Debug, Clone, Default)]
pub(crate) struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Writes the low `count` bits of `value`, most significant first.
    pub(crate) fn write_bits(&mut self, value: u64, count: u32) {
        debug_assert!(count <= 64);
        for i in (0..count).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
    }

    /// Number of bits written so far.
    pub(crate) fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns the stream as bytes, padding the last byte with zero bits.
    pub(crate) fn into_bytes(mut self) -> Vec<u8> {
        self.bits.set_uninitialized(false);
        self.bits.into_vec()
    }
}

/// Cursor over a bit stream it owns outright.
///
/// The reader never borrows its input: callers hand over a buffer that is
/// private to this reader, so concurrent readers of the same chunk cannot
/// observe each other's progress.
#[derive(Debug, Clone)]
pub(crate) struct BitReader {
    bits: BitVec<u8, Msb0>,
    pos: usize,
}

impl BitReader {
    pub(crate) fn new(stream: Vec<u8>) -> Self {
        Self {
            bits: BitVec::from_vec(stream),
            pos: 0,
        }
    }

    pub(crate) fn read_bit(&mut self) -> Result<bool> {
        let bit = self
            .bits
            .get(self.pos)
            .map(|bit| *bit)
            .ok_or_else(|| self.truncated(1))?;
        self.pos += 1;
        Ok(bit)
    }

    /// Reads `count` bits as an unsigned integer, most significant first.
    pub(crate) fn read_bits(&mut self, count: u32) -> Result<u64> {
        debug_assert!(count <= 64);
        let end = self.pos + count as usize;
        if end > self.bits.len() {
            return Err(self.truncated(count));
        }
        let value = self.bits[self.pos..end]
            .iter()
            .by_vals()
            .fold(0u64, |acc, bit| (acc << 1) | u64::from(bit));
        self.pos = end;
        Ok(value)
    }

    fn truncated(&self, wanted: u32) -> ChunkError {
        ChunkError::CorruptStream(format!(
            "stream truncated: wanted {wanted} bits at bit {}, stream holds {}",
            self.pos,
            self.bits.len()
        ))
    }
}
