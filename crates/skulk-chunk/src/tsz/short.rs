//! Short-range stream: `T0` in-stream, fixed-width first delta.

use super::{
    advance_ts, next_delta, read_dod, write_dod, write_end_marker, BitReader, BitWriter, Point,
    XorDecoder, XorEncoder, SHORT_ESCAPE_BITS,
};
use crate::error::{ChunkError, Result};

/// Width of the first sample's delta from `T0`.
const FIRST_DELTA_BITS: u32 = 14;

/// First-delta value reserved to mark a stream with no samples.
const EMPTY_MARKER: u64 = (1 << FIRST_DELTA_BITS) - 1;

/// Number of seconds after `T0` a short-range stream can address.
pub const MAX_SHORT_WINDOW: u32 = EMPTY_MARKER as u32;

/// Encoder for the short-range stream.
#[derive(Debug, Clone)]
pub struct Series4h {
    t0: u32,
    writer: BitWriter,
    last_ts: Option<u32>,
    prev_delta: i64,
    values: XorEncoder,
    count: u32,
}

impl Series4h {
    /// Creates an encoder anchored at `t0`.
    pub fn new(t0: u32) -> Self {
        let mut writer = BitWriter::new();
        writer.write_bits(u64::from(t0), 32);
        Self {
            t0,
            writer,
            last_ts: None,
            prev_delta: 0,
            values: XorEncoder::default(),
            count: 0,
        }
    }

    /// Appends a sample.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::OutOfOrder` if `ts` is before `T0` or not after the
    /// previous sample, and `ChunkError::OutsideSpan` if it lies beyond the
    /// [`MAX_SHORT_WINDOW`] the stream can address.
    pub fn push(&mut self, ts: u32, val: f64) -> Result<()> {
        if ts < self.t0 {
            return Err(ChunkError::OutOfOrder { ts, prev: self.t0 });
        }
        if ts - self.t0 >= MAX_SHORT_WINDOW {
            return Err(ChunkError::OutsideSpan {
                ts,
                end: self.t0.saturating_add(MAX_SHORT_WINDOW),
            });
        }

        match self.last_ts {
            None => {
                let delta = ts - self.t0;
                self.writer.write_bits(u64::from(delta), FIRST_DELTA_BITS);
                self.values.encode_first(&mut self.writer, val);
                self.prev_delta = i64::from(delta);
            }
            Some(prev) => {
                if ts <= prev {
                    return Err(ChunkError::OutOfOrder { ts, prev });
                }
                let delta = i64::from(ts - prev);
                write_dod(&mut self.writer, delta - self.prev_delta, SHORT_ESCAPE_BITS);
                self.values.encode(&mut self.writer, val);
                self.prev_delta = delta;
            }
        }

        self.last_ts = Some(ts);
        self.count += 1;
        Ok(())
    }

    /// Start of the stream.
    pub fn t0(&self) -> u32 {
        self.t0
    }

    /// Timestamp of the most recent sample.
    pub fn last_ts(&self) -> Option<u32> {
        self.last_ts
    }

    /// Number of samples pushed.
    pub fn num_points(&self) -> u32 {
        self.count
    }

    /// Bits written so far.
    pub fn bit_len(&self) -> usize {
        self.writer.len()
    }

    /// Terminates the stream and returns its bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.last_ts.is_none() {
            self.writer.write_bits(EMPTY_MARKER, FIRST_DELTA_BITS);
        } else {
            write_end_marker(&mut self.writer, SHORT_ESCAPE_BITS);
        }
        self.writer.into_bytes()
    }
}

/// Decoder for the short-range stream.
///
/// Takes ownership of the stream it reads.
#[derive(Debug, Clone)]
pub struct Iter4h {
    reader: BitReader,
    t0: u32,
    ts: u32,
    delta: i64,
    values: XorDecoder,
    started: bool,
    done: bool,
}

impl Iter4h {
    /// Creates a decoder over `stream`, reading `T0` from its first 32 bits.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::CorruptStream` if the stream cannot hold `T0`.
    pub fn new(stream: Vec<u8>) -> Result<Self> {
        let mut reader = BitReader::new(stream);
        let t0 = reader.read_bits(32)? as u32;
        Ok(Self {
            reader,
            t0,
            ts: t0,
            delta: 0,
            values: XorDecoder::default(),
            started: false,
            done: false,
        })
    }

    /// `T0` as recorded in the stream.
    pub fn t0(&self) -> u32 {
        self.t0
    }

    fn read_next(&mut self) -> Result<Option<Point>> {
        if !self.started {
            self.started = true;
            let delta = self.reader.read_bits(FIRST_DELTA_BITS)?;
            if delta == EMPTY_MARKER {
                return Ok(None);
            }
            self.delta = delta as i64;
            self.ts = self.t0.checked_add(delta as u32).ok_or_else(|| {
                ChunkError::CorruptStream(format!("first timestamp overflows: {} + {delta}", self.t0))
            })?;
            let val = self.values.decode_first(&mut self.reader)?;
            return Ok(Some(Point::new(self.ts, val)));
        }

        let Some(dod) = read_dod(&mut self.reader, SHORT_ESCAPE_BITS)? else {
            return Ok(None);
        };
        self.delta = next_delta(self.delta, dod)?;
        self.ts = advance_ts(self.ts, self.delta)?;
        let val = self.values.decode(&mut self.reader)?;
        Ok(Some(Point::new(self.ts, val)))
    }
}

impl Iterator for Iter4h {
    type Item = Result<Point>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(point)) => Some(Ok(point)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
