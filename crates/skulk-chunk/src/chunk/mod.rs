//! Chunks: bounded-span containers of compressed samples.
//!
//! The write path is
//!
//! ```text
//! samples → Chunk::push → Chunk::finish → payload bytes → IterGen
//! ```
//!
//! and the read path
//!
//! ```text
//! (t0, payload) → IterGen::new → IterGen::get → ChunkIter → points
//! ```

pub mod format;
pub mod itergen;
pub mod merge;
pub mod span;
pub mod writer;

pub use crate::tsz::Point;
pub use format::{Format, Header, MAX_SHORT_SPAN};
pub use itergen::{ChunkIter, IterGen};
pub use merge::{sort_ascending, IterGensAsc, MergedPoints};
pub use span::{align, chunk_span, span_code, SpanCode, CHUNK_SPANS};
pub use writer::{SeriesWriter, WriterConfig};

use crate::error::{ChunkError, Result};
use crate::tsz::{Series4h, SeriesLong};
use bytes::Bytes;
use tracing::debug;

/// Codec state of an unfinished chunk.
#[derive(Debug, Clone)]
enum Encoder {
    Short(Series4h),
    Long(SeriesLong),
}

impl Encoder {
    fn push(&mut self, ts: u32, val: f64) -> Result<()> {
        match self {
            Self::Short(series) => series.push(ts, val),
            Self::Long(series) => series.push(ts, val),
        }
    }

    fn last_ts(&self) -> Option<u32> {
        match self {
            Self::Short(series) => series.last_ts(),
            Self::Long(series) => series.last_ts(),
        }
    }

    fn num_points(&self) -> u32 {
        match self {
            Self::Short(series) => series.num_points(),
            Self::Long(series) => series.num_points(),
        }
    }

    fn finish(self) -> Vec<u8> {
        match self {
            Self::Short(series) => series.finish(),
            Self::Long(series) => series.finish(),
        }
    }
}

/// Accumulator for the samples of one span.
///
/// Owned by a single writer. Samples must arrive in strictly increasing
/// timestamp order, starting at or after `T0` and ending before `T0 + span`.
/// A sample past the span closes the chunk; [`Chunk::finish`] seals it and
/// returns the payload.
#[derive(Debug, Clone)]
pub struct Chunk {
    t0: u32,
    span_code: SpanCode,
    span: u32,
    format: Format,
    /// `None` once finished.
    encoder: Option<Encoder>,
    closed: bool,
    num_points: u32,
    last_ts: Option<u32>,
}

impl Chunk {
    /// Creates an open chunk using the long-range format.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::InvalidSpan` if `span_code` is outside the span table.
    pub fn new(t0: u32, span_code: SpanCode) -> Result<Self> {
        Self::with_format(t0, span_code, Format::LongWithSpan)
    }

    /// Creates an open chunk written in `format`.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::InvalidSpan` if `span_code` is outside the span
    /// table, or `ChunkError::SpanTooLong` if a short-range format is asked to
    /// cover more than [`MAX_SHORT_SPAN`].
    pub fn with_format(t0: u32, span_code: SpanCode, format: Format) -> Result<Self> {
        let span = chunk_span(span_code).ok_or(ChunkError::InvalidSpan(span_code))?;
        let encoder = match format {
            Format::ShortFixed | Format::ShortWithSpan => {
                if span > MAX_SHORT_SPAN {
                    return Err(ChunkError::SpanTooLong {
                        span,
                        max: MAX_SHORT_SPAN,
                    });
                }
                Encoder::Short(Series4h::new(t0))
            }
            Format::LongWithSpan => Encoder::Long(SeriesLong::new(t0)),
        };

        Ok(Self {
            t0,
            span_code,
            span,
            format,
            encoder: Some(encoder),
            closed: false,
            num_points: 0,
            last_ts: None,
        })
    }

    /// Appends a sample.
    ///
    /// # Errors
    ///
    /// - `ChunkError::ChunkClosed` if the chunk is closed or finished.
    /// - `ChunkError::OutsideSpan` if `ts` is at or past [`Chunk::end_ts`]; the
    ///   chunk is closed as a side effect.
    /// - `ChunkError::OutOfOrder` if `ts` is before `T0` or not after the
    ///   previous sample.
    pub fn push(&mut self, ts: u32, val: f64) -> Result<()> {
        let end = self.end_ts();
        let encoder = match self.encoder.as_mut() {
            Some(encoder) if !self.closed => encoder,
            _ => return Err(ChunkError::ChunkClosed),
        };
        if ts >= end {
            self.closed = true;
            return Err(ChunkError::OutsideSpan { ts, end });
        }

        encoder.push(ts, val)?;
        self.num_points = encoder.num_points();
        self.last_ts = encoder.last_ts();
        Ok(())
    }

    /// Stops accepting samples without finishing.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Seals the chunk and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AlreadyFinished` on a second call.
    pub fn finish(&mut self) -> Result<Bytes> {
        let encoder = self.encoder.take().ok_or(ChunkError::AlreadyFinished)?;
        self.closed = true;

        let stream = encoder.finish();
        let header = Header::new(self.format, self.span_code);
        let mut payload = Vec::with_capacity(header.byte_len() + stream.len());
        header.write_to(&mut payload);
        payload.extend_from_slice(&stream);

        debug!(
            t0 = self.t0,
            span = self.span,
            format = ?self.format,
            points = self.num_points,
            bytes = payload.len(),
            "finished chunk"
        );
        Ok(Bytes::from(payload))
    }

    /// Finishes the chunk and wraps the payload in an [`IterGen`].
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AlreadyFinished` if the chunk was finished before.
    pub fn into_itergen(mut self) -> Result<IterGen> {
        let payload = self.finish()?;
        Ok(IterGen::new_unchecked(self.t0, payload))
    }

    /// Start of the chunk's span.
    pub fn t0(&self) -> u32 {
        self.t0
    }

    /// Span code the chunk was created with.
    pub fn span_code(&self) -> SpanCode {
        self.span_code
    }

    /// Span in seconds.
    pub fn span(&self) -> u32 {
        self.span
    }

    /// Exclusive end of the chunk's span.
    pub fn end_ts(&self) -> u32 {
        self.t0.saturating_add(self.span)
    }

    /// Payload format the chunk is written in.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Number of samples accepted.
    pub fn num_points(&self) -> u32 {
        self.num_points
    }

    /// Timestamp of the most recent sample.
    pub fn last_ts(&self) -> Option<u32> {
        self.last_ts
    }

    /// Returns true once the chunk stopped accepting samples.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns true once [`Chunk::finish`] succeeded.
    pub fn is_finished(&self) -> bool {
        self.encoder.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u32 = 1_500_000_000 - 1_500_000_000 % 600;
    const TEN_MINUTES: SpanCode = 11;

    #[test]
    fn test_new_rejects_unknown_span_code() {
        let code = CHUNK_SPANS.len() as SpanCode;
        assert_eq!(Chunk::new(T0, code).err(), Some(ChunkError::InvalidSpan(code)));
    }

    #[test]
    fn test_short_format_rejects_long_span() {
        let day = span_code(86_400).unwrap();
        assert_eq!(
            Chunk::with_format(T0, day, Format::ShortWithSpan).err(),
            Some(ChunkError::SpanTooLong { span: 86_400, max: MAX_SHORT_SPAN })
        );
        assert!(Chunk::with_format(T0, day, Format::LongWithSpan).is_ok());
    }

    #[test]
    fn test_first_push_at_t0() {
        let mut chunk = Chunk::new(T0, TEN_MINUTES).unwrap();
        chunk.push(T0, 1.0).unwrap();
        assert_eq!(chunk.num_points(), 1);
        assert_eq!(chunk.last_ts(), Some(T0));
    }

    #[test]
    fn test_out_of_order() {
        let mut chunk = Chunk::new(T0, TEN_MINUTES).unwrap();
        assert_eq!(
            chunk.push(T0 - 1, 1.0),
            Err(ChunkError::OutOfOrder { ts: T0 - 1, prev: T0 })
        );
        chunk.push(T0 + 10, 1.0).unwrap();
        assert_eq!(
            chunk.push(T0 + 10, 2.0),
            Err(ChunkError::OutOfOrder { ts: T0 + 10, prev: T0 + 10 })
        );
        assert_eq!(
            chunk.push(T0 + 5, 2.0),
            Err(ChunkError::OutOfOrder { ts: T0 + 5, prev: T0 + 10 })
        );
        assert!(!chunk.is_closed());
        chunk.push(T0 + 20, 2.0).unwrap();
        assert_eq!(chunk.num_points(), 2);
    }

    #[test]
    fn test_push_past_span_closes() {
        let mut chunk = Chunk::new(T0, TEN_MINUTES).unwrap();
        chunk.push(T0 + 599, 1.0).unwrap();
        assert_eq!(
            chunk.push(T0 + 600, 2.0),
            Err(ChunkError::OutsideSpan { ts: T0 + 600, end: T0 + 600 })
        );
        assert!(chunk.is_closed());
        assert_eq!(chunk.push(T0 + 601, 2.0), Err(ChunkError::ChunkClosed));

        let ig = chunk.into_itergen().unwrap();
        let points: Vec<Point> = ig.get().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(points, vec![Point::new(T0 + 599, 1.0)]);
    }

    #[test]
    fn test_finish_twice() {
        let mut chunk = Chunk::new(T0, TEN_MINUTES).unwrap();
        chunk.push(T0, 1.0).unwrap();
        chunk.finish().unwrap();
        assert!(chunk.is_finished());
        assert_eq!(chunk.finish(), Err(ChunkError::AlreadyFinished));
        assert_eq!(chunk.push(T0 + 1, 1.0), Err(ChunkError::ChunkClosed));
    }

    #[test]
    fn test_close_keeps_points() {
        let mut chunk = Chunk::new(T0, TEN_MINUTES).unwrap();
        chunk.push(T0 + 1, 3.0).unwrap();
        chunk.close();
        assert_eq!(chunk.push(T0 + 2, 3.0), Err(ChunkError::ChunkClosed));
        let payload = chunk.finish().unwrap();
        let ig = IterGen::new(T0, payload).unwrap();
        assert_eq!(ig.get().unwrap().count(), 1);
    }

    #[test]
    fn test_payload_header() {
        for format in [Format::ShortFixed, Format::ShortWithSpan, Format::LongWithSpan] {
            let mut chunk = Chunk::with_format(T0, TEN_MINUTES, format).unwrap();
            chunk.push(T0 + 30, 0.5).unwrap();
            let payload = chunk.finish().unwrap();
            assert_eq!(payload[0], format.as_u8());
            if format != Format::ShortFixed {
                assert_eq!(payload[1], TEN_MINUTES);
            }
            let ig = IterGen::new(T0, payload).unwrap();
            assert_eq!(ig.format(), Some(format));
        }
    }

    #[test]
    fn test_empty_chunk_is_valid_and_exhausted() {
        for format in [Format::ShortFixed, Format::ShortWithSpan, Format::LongWithSpan] {
            let mut chunk = Chunk::with_format(T0, TEN_MINUTES, format).unwrap();
            let ig = IterGen::new(T0, chunk.finish().unwrap()).unwrap();
            assert_eq!(ig.get().unwrap().count(), 0, "format {format:?}");
        }
    }
}
