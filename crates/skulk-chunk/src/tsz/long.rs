//! Long-range stream: `T0` out of band, 64-bit escape field.

use super::{
    advance_ts, next_delta, read_dod, write_dod, write_end_marker, BitReader, BitWriter, Point,
    XorDecoder, XorEncoder, LONG_ESCAPE_BITS,
};
use crate::error::{ChunkError, Result};

/// Encoder for the long-range stream.
///
/// `T0` is not written to the stream; the decoder must be given the same
/// value through [`IterLong::new`].
#[derive(Debug, Clone)]
pub struct SeriesLong {
    t0: u32,
    writer: BitWriter,
    last_ts: Option<u32>,
    prev_delta: i64,
    values: XorEncoder,
    count: u32,
}

impl SeriesLong {
    /// Creates an encoder anchored at `t0`.
    pub fn new(t0: u32) -> Self {
        Self {
            t0,
            writer: BitWriter::new(),
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
    /// previous sample.
    pub fn push(&mut self, ts: u32, val: f64) -> Result<()> {
        let prev = self.last_ts.unwrap_or(self.t0);
        let in_order = match self.last_ts {
            None => ts >= self.t0,
            Some(last) => ts > last,
        };
        if !in_order {
            return Err(ChunkError::OutOfOrder { ts, prev });
        }

        let delta = i64::from(ts - prev);
        write_dod(&mut self.writer, delta - self.prev_delta, LONG_ESCAPE_BITS);
        if self.last_ts.is_none() {
            self.values.encode_first(&mut self.writer, val);
        } else {
            self.values.encode(&mut self.writer, val);
        }
        self.prev_delta = delta;
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
        write_end_marker(&mut self.writer, LONG_ESCAPE_BITS);
        self.writer.into_bytes()
    }
}

/// Decoder for the long-range stream.
///
/// Takes ownership of the stream it reads.
#[derive(Debug, Clone)]
pub struct IterLong {
    reader: BitReader,
    t0: u32,
    ts: u32,
    delta: i64,
    values: XorDecoder,
    started: bool,
    done: bool,
}

impl IterLong {
    /// Creates a decoder over `stream` anchored at `t0`.
    pub fn new(t0: u32, stream: Vec<u8>) -> Self {
        Self {
            reader: BitReader::new(stream),
            t0,
            ts: t0,
            delta: 0,
            values: XorDecoder::default(),
            started: false,
            done: false,
        }
    }

    /// `T0` the decoder was anchored at.
    pub fn t0(&self) -> u32 {
        self.t0
    }

    fn read_next(&mut self) -> Result<Option<Point>> {
        let Some(dod) = read_dod(&mut self.reader, LONG_ESCAPE_BITS)? else {
            return Ok(None);
        };
        self.delta = next_delta(self.delta, dod)?;

        if !self.started {
            self.started = true;
            // the first sample may sit exactly on T0
            self.ts = u32::try_from(self.delta)
                .ok()
                .and_then(|delta| self.t0.checked_add(delta))
                .ok_or_else(|| {
                    ChunkError::CorruptStream(format!(
                        "first timestamp out of range: {} + {}",
                        self.t0, self.delta
                    ))
                })?;
            let val = self.values.decode_first(&mut self.reader)?;
            return Ok(Some(Point::new(self.ts, val)));
        }

        self.ts = advance_ts(self.ts, self.delta)?;
        let val = self.values.decode(&mut self.reader)?;
        Ok(Some(Point::new(self.ts, val)))
    }
}

impl Iterator for IterLong {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(t0: u32, points: &[(u32, f64)]) -> Vec<u8> {
        let mut series = SeriesLong::new(t0);
        for &(ts, val) in points {
            series.push(ts, val).unwrap();
        }
        series.finish()
    }

    fn decode(t0: u32, stream: Vec<u8>) -> Vec<(u32, f64)> {
        IterLong::new(t0, stream)
            .map(|p| p.map(|p| (p.ts, p.val)).unwrap())
            .collect()
    }

    #[test]
    fn test_roundtrip_day_span() {
        let t0 = 1_500_000_000 - 1_500_000_000 % 86_400;
        let points: Vec<(u32, f64)> = (0..288).map(|i| (t0 + 300 * i, 20.0 + (i % 7) as f64)).collect();
        assert_eq!(decode(t0, encode(t0, &points)), points);
    }

    #[test]
    fn test_roundtrip_far_outside_short_window() {
        let t0 = 1_000;
        let points = vec![
            (t0 + 50_000, 1.0),
            (t0 + 50_001, 2.0),
            (t0 + 3_000_000, 3.0),
            (u32::MAX - 1, 4.0),
        ];
        assert_eq!(decode(t0, encode(t0, &points)), points);
    }

    #[test]
    fn test_first_sample_on_t0() {
        let points = vec![(600, 1.0), (660, 1.0), (720, 1.0)];
        let stream = encode(600, &points);
        assert_eq!(decode(600, stream), points);
    }

    #[test]
    fn test_empty_stream() {
        let mut iter = IterLong::new(600, encode(600, &[]));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_push_rejects_out_of_order() {
        let mut series = SeriesLong::new(600);
        assert_eq!(
            series.push(599, 1.0),
            Err(ChunkError::OutOfOrder { ts: 599, prev: 600 })
        );
        series.push(600, 1.0).unwrap();
        assert_eq!(
            series.push(600, 1.0),
            Err(ChunkError::OutOfOrder { ts: 600, prev: 600 })
        );
        assert_eq!(series.last_ts(), Some(600));
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let points: Vec<(u32, f64)> = (0..50).map(|i| (600 + 7 * i * i, i as f64 / 3.0)).collect();
        let mut stream = encode(600, &points);
        stream.truncate(stream.len() - 3);

        let last = IterLong::new(600, stream).last();
        assert!(matches!(last, Some(Err(ChunkError::CorruptStream(_)))));
    }

    #[test]
    fn test_escape_overflowing_delta_is_corrupt() {
        let mut writer = BitWriter::new();
        write_dod(&mut writer, 1, LONG_ESCAPE_BITS);
        writer.write_bits(2.5f64.to_bits(), 64);
        writer.write_bits(0b1111, 4);
        writer.write_bits(i64::MAX as u64, LONG_ESCAPE_BITS);
        writer.write_bit(false);

        let results: Vec<_> = IterLong::new(600, writer.into_bytes()).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Ok(Point::new(601, 2.5)));
        assert!(matches!(results[1], Err(ChunkError::CorruptStream(_))));
    }

    #[test]
    fn test_escape_with_negative_delta_is_corrupt() {
        let mut writer = BitWriter::new();
        write_dod(&mut writer, 3_000, LONG_ESCAPE_BITS);
        writer.write_bits(0, 64);
        write_dod(&mut writer, i64::MIN + 1, LONG_ESCAPE_BITS);
        writer.write_bit(false);

        let last = IterLong::new(600, writer.into_bytes()).last();
        assert!(matches!(last, Some(Err(ChunkError::CorruptStream(_)))));
    }

    #[test]
    fn test_decode_with_other_t0_shifts_points() {
        let points = vec![(700, 1.0), (760, 2.0)];
        let stream = encode(600, &points);
        assert_eq!(decode(0, stream), vec![(100, 1.0), (160, 2.0)]);
    }
}
