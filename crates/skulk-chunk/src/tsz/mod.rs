//! Gorilla ("tsz") compression for chunk sample streams.
//!
//! Two stream variants share the same timestamp and value encodings and
//! differ only in how the first sample is anchored:
//!
//! - [`Series4h`] writes `T0` into the stream as 32 bits and stores the first
//!   sample as a fixed 14-bit delta from it. Every sample must fall within
//!   [`MAX_SHORT_WINDOW`] seconds of `T0`.
//! - [`SeriesLong`] keeps `T0` out of band (the caller supplies it again when
//!   decoding) and codes the first delta like any other delta-of-delta, with a
//!   64-bit escape field so spans of any length in the span table fit.
//!
//! # Timestamp Encoding (Delta-of-Delta)
//!
//! - `0`: `'0'` (1 bit)
//! - `[-63, 64]`: `'10'` + 7 bits
//! - `[-255, 256]`: `'110'` + 9 bits
//! - `[-2047, 2048]`: `'1110'` + 12 bits
//! - else: `'1111'` + escape field (32 bits short, 64 bits long)
//!
//! The escape field holding all ones marks the end of the stream. A genuine
//! delta-of-delta of -1 always takes the 7-bit bucket, so the marker never
//! collides with data.
//!
//! # Value Encoding (XOR-based)
//!
//! - First value: 64 bits raw (IEEE 754)
//! - XOR = 0: `'0'` (1 bit)
//! - Same window: `'10'` + meaningful bits
//! - New window: `'11'` + 5 bits leading zeros + 6 bits length (64 stored as 0)
//!   + meaningful bits

mod bits;
mod long;
mod short;

pub(crate) use bits::{BitReader, BitWriter};
pub use long::{IterLong, SeriesLong};
pub use short::{Iter4h, Series4h, MAX_SHORT_WINDOW};

use crate::error::{ChunkError, Result};

/// A single decoded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Unix timestamp in seconds.
    pub ts: u32,
    /// Sample value.
    pub val: f64,
}

impl Point {
    /// Creates a new point.
    pub fn new(ts: u32, val: f64) -> Self {
        Self { ts, val }
    }
}

/// Escape field width of the short-range stream.
pub(crate) const SHORT_ESCAPE_BITS: u32 = 32;

/// Escape field width of the long-range stream.
pub(crate) const LONG_ESCAPE_BITS: u32 = 64;

fn all_ones(count: u32) -> u64 {
    if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    }
}

fn sign_extend(raw: u64, count: u32) -> i64 {
    let shift = 64 - count;
    ((raw << shift) as i64) >> shift
}

/// Writes a delta-of-delta using the bucketed prefix code.
pub(crate) fn write_dod(writer: &mut BitWriter, dod: i64, escape_bits: u32) {
    if dod == 0 {
        writer.write_bit(false);
    } else if (-63..=64).contains(&dod) {
        writer.write_bits(0b10, 2);
        writer.write_bits((dod + 63) as u64, 7);
    } else if (-255..=256).contains(&dod) {
        writer.write_bits(0b110, 3);
        writer.write_bits((dod + 255) as u64, 9);
    } else if (-2047..=2048).contains(&dod) {
        writer.write_bits(0b1110, 4);
        writer.write_bits((dod + 2047) as u64, 12);
    } else {
        writer.write_bits(0b1111, 4);
        writer.write_bits(dod as u64, escape_bits);
    }
}

/// Reads a delta-of-delta. Returns `None` at the end marker.
pub(crate) fn read_dod(reader: &mut BitReader, escape_bits: u32) -> Result<Option<i64>> {
    let mut prefix = 0;
    while prefix < 4 && reader.read_bit()? {
        prefix += 1;
    }

    let dod = match prefix {
        0 => 0,
        1 => reader.read_bits(7)? as i64 - 63,
        2 => reader.read_bits(9)? as i64 - 255,
        3 => reader.read_bits(12)? as i64 - 2047,
        _ => {
            let raw = reader.read_bits(escape_bits)?;
            if raw == all_ones(escape_bits) {
                return Ok(None);
            }
            sign_extend(raw, escape_bits)
        }
    };
    Ok(Some(dod))
}

/// Writes the end-of-stream record.
pub(crate) fn write_end_marker(writer: &mut BitWriter, escape_bits: u32) {
    writer.write_bits(0b1111, 4);
    writer.write_bits(all_ones(escape_bits), escape_bits);
    writer.write_bit(false);
}

/// Applies a decoded delta-of-delta to the running delta.
pub(crate) fn next_delta(delta: i64, dod: i64) -> Result<i64> {
    delta.checked_add(dod).ok_or_else(|| {
        ChunkError::CorruptStream(format!("timestamp delta overflow: {delta} + {dod}"))
    })
}

/// Applies a decoded delta to the previous timestamp.
pub(crate) fn advance_ts(prev_ts: u32, delta: i64) -> Result<u32> {
    if delta <= 0 {
        return Err(ChunkError::CorruptStream(format!(
            "non-increasing timestamp delta {delta} after {prev_ts}"
        )));
    }
    u32::try_from(i64::from(prev_ts) + delta).map_err(|_| {
        ChunkError::CorruptStream(format!("timestamp overflow: {prev_ts} + {delta}"))
    })
}

/// XOR encoder state for float values.
#[derive(Debug, Clone, Default)]
pub(crate) struct XorEncoder {
    prev: u64,
    /// Leading and trailing zero counts of the current window.
    window: Option<(u32, u32)>,
}

impl XorEncoder {
    pub(crate) fn encode_first(&mut self, writer: &mut BitWriter, value: f64) {
        let bits = value.to_bits();
        writer.write_bits(bits, 64);
        self.prev = bits;
    }

    pub(crate) fn encode(&mut self, writer: &mut BitWriter, value: f64) {
        let bits = value.to_bits();
        let xor = bits ^ self.prev;
        self.prev = bits;

        if xor == 0 {
            writer.write_bit(false);
            return;
        }

        // 5-bit field
        let leading = xor.leading_zeros().min(31);
        let trailing = xor.trailing_zeros();

        match self.window {
            Some((prev_leading, prev_trailing))
                if leading >= prev_leading && trailing >= prev_trailing =>
            {
                writer.write_bits(0b10, 2);
                let meaningful = 64 - prev_leading - prev_trailing;
                writer.write_bits(xor >> prev_trailing, meaningful);
            }
            _ => {
                writer.write_bits(0b11, 2);
                writer.write_bits(u64::from(leading), 5);
                let meaningful = 64 - leading - trailing;
                writer.write_bits(u64::from(meaningful & 0x3f), 6);
                writer.write_bits(xor >> trailing, meaningful);
                self.window = Some((leading, trailing));
            }
        }
    }
}

/// XOR decoder state for float values.
#[derive(Debug, Clone, Default)]
pub(crate) struct XorDecoder {
    prev: u64,
    window: Option<(u32, u32)>,
}

impl XorDecoder {
    pub(crate) fn decode_first(&mut self, reader: &mut BitReader) -> Result<f64> {
        self.prev = reader.read_bits(64)?;
        Ok(f64::from_bits(self.prev))
    }

    pub(crate) fn decode(&mut self, reader: &mut BitReader) -> Result<f64> {
        if !reader.read_bit()? {
            return Ok(f64::from_bits(self.prev));
        }

        let (leading, trailing) = if reader.read_bit()? {
            let leading = reader.read_bits(5)? as u32;
            let meaningful = match reader.read_bits(6)? as u32 {
                0 => 64,
                n => n,
            };
            if leading + meaningful > 64 {
                return Err(ChunkError::CorruptStream(format!(
                    "value window of {leading} leading and {meaningful} meaningful bits"
                )));
            }
            let window = (leading, 64 - leading - meaningful);
            self.window = Some(window);
            window
        } else {
            self.window.ok_or_else(|| {
                ChunkError::CorruptStream("value window reused before one was set".into())
            })?
        };

        let xor = reader.read_bits(64 - leading - trailing)? << trailing;
        self.prev ^= xor;
        Ok(f64::from_bits(self.prev))
    }
}
