//! Series writer: drives the chunk lifecycle for one metric stream.
//!
//! The writer keeps one open [`Chunk`]. A sample past the chunk's span
//! finishes it and opens the next chunk at the span-aligned boundary of the
//! sample, handing the finished chunk back as an [`IterGen`] for the storage
//! layer to persist.
//!
//! # Example
//!
//! ```rust
//! use skulk_chunk::chunk::{SeriesWriter, WriterConfig};
//!
//! let mut writer = SeriesWriter::new(WriterConfig::default()).unwrap();
//! let mut finished = Vec::new();
//! for i in 0..1000u32 {
//!     if let Some(itergen) = writer.push(1_500_000_000 + i * 60, f64::from(i)).unwrap() {
//!         finished.push(itergen);
//!     }
//! }
//! finished.extend(writer.flush().unwrap());
//! assert!(finished.len() > 1);
//! ```

use super::format::{Format, MAX_SHORT_SPAN};
use super::itergen::IterGen;
use super::span::{align, chunk_span, SpanCode, DEFAULT_SPAN_CODE};
use super::Chunk;
use crate::error::{ChunkError, Result};
use tracing::{debug, warn};

/// Configuration for a [`SeriesWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Span code of the chunks the writer creates.
    ///
    /// Default: 2h.
    pub span_code: SpanCode,

    /// Payload format of the chunks the writer creates.
    ///
    /// Default: [`Format::LongWithSpan`].
    pub format: Format,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            span_code: DEFAULT_SPAN_CODE,
            format: Format::LongWithSpan,
        }
    }
}

impl WriterConfig {
    /// Creates a new configuration with a custom span code.
    pub fn with_span_code(mut self, span_code: SpanCode) -> Self {
        self.span_code = span_code;
        self
    }

    /// Creates a new configuration with a custom payload format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Checks the configuration and returns the span in seconds.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::InvalidSpan` for a span code outside the span
    /// table and `ChunkError::SpanTooLong` for a short-range format with a
    /// span above [`MAX_SHORT_SPAN`].
    pub fn validate(&self) -> Result<u32> {
        let span = chunk_span(self.span_code).ok_or(ChunkError::InvalidSpan(self.span_code))?;
        if self.format.is_short() && span > MAX_SHORT_SPAN {
            return Err(ChunkError::SpanTooLong {
                span,
                max: MAX_SHORT_SPAN,
            });
        }
        Ok(span)
    }
}

/// Single-writer chunk roller for one metric stream.
#[derive(Debug)]
pub struct SeriesWriter {
    config: WriterConfig,
    span: u32,
    current: Option<Chunk>,
}

impl SeriesWriter {
    /// Creates a writer.
    ///
    /// # Errors
    ///
    /// Returns the error of [`WriterConfig::validate`].
    pub fn new(config: WriterConfig) -> Result<Self> {
        let span = config.validate()?;
        Ok(Self {
            config,
            span,
            current: None,
        })
    }

    /// Returns the writer configuration.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Returns the open chunk, if any.
    pub fn current(&self) -> Option<&Chunk> {
        self.current.as_ref()
    }

    /// Appends a sample, rolling over to a new chunk when `ts` is past the
    /// open chunk's span.
    ///
    /// Returns the chunk finished by the roll-over, if there was one.
    ///
    /// # Errors
    ///
    /// - `ChunkError::OutOfOrder` for a sample older than the open chunk's
    ///   `T0` or not after the previous sample.
    /// - `ChunkError::OutsideSpan` for a sample at `u32::MAX`, past the end of
    ///   the last chunk the timestamp range can hold.
    ///
    /// Nothing is written and no chunk is finished in either case.
    pub fn push(&mut self, ts: u32, val: f64) -> Result<Option<IterGen>> {
        // the last window of the u32 range ends at u32::MAX, which no chunk holds
        let end = align(ts, self.span).saturating_add(self.span);
        if ts >= end {
            warn!(ts, end, "sample past the last representable chunk, discarding");
            return Err(ChunkError::OutsideSpan { ts, end });
        }

        let mut finished = None;

        if let Some(chunk) = &self.current {
            if ts < chunk.t0() {
                let prev = chunk.last_ts().unwrap_or(chunk.t0());
                warn!(ts, t0 = chunk.t0(), "sample older than open chunk, discarding");
                return Err(ChunkError::OutOfOrder { ts, prev });
            }
            if ts >= chunk.end_ts() {
                let next = self.new_chunk(ts)?;
                if let Some(old) = self.current.replace(next) {
                    debug!(old_t0 = old.t0(), new_t0 = align(ts, self.span), "rolling over chunk");
                    finished = Some(old.into_itergen()?);
                }
            }
        }

        let chunk = match self.current.take() {
            Some(chunk) => chunk,
            None => self.new_chunk(ts)?,
        };
        self.current.insert(chunk).push(ts, val)?;
        Ok(finished)
    }

    /// Finishes the open chunk, if any.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AlreadyFinished` if the open chunk was already
    /// sealed, which the writer never does on its own.
    pub fn flush(&mut self) -> Result<Option<IterGen>> {
        self.current.take().map(Chunk::into_itergen).transpose()
    }

    fn new_chunk(&self, ts: u32) -> Result<Chunk> {
        Chunk::with_format(align(ts, self.span), self.config.span_code, self.config.format)
    }
}
