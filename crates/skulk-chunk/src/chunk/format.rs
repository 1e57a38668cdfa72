//! Chunk payload formats and header parsing.
//!
//! ```text
//! ┌────────┬───────────┬──────────────────────────┐
//! │ format │ span code │ codec bit stream ...     │
//! │ 1 byte │ 1 byte    │ (span code absent for    │
//! │        │           │  ShortFixed)             │
//! └────────┴───────────┴──────────────────────────┘
//! ```

use super::span::{chunk_span, is_valid_span_code, SpanCode};
use crate::error::{ChunkError, Result};

/// Largest span a short-range format may declare (4h).
pub const MAX_SHORT_SPAN: u32 = 4 * 3600;

/// Format discriminator stored at offset 0 of every chunk payload.
///
/// Values are persisted and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Format {
    /// Legacy short-range stream without a span byte.
    ShortFixed = 0,
    /// Short-range stream with a span byte.
    ShortWithSpan = 1,
    /// Long-range stream with a span byte; `T0` lives outside the stream.
    LongWithSpan = 2,
}

impl Format {
    /// Creates a Format from its persisted byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ShortFixed),
            1 => Some(Self::ShortWithSpan),
            2 => Some(Self::LongWithSpan),
            _ => None,
        }
    }

    /// Returns the persisted byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Number of header bytes preceding the codec stream.
    pub fn header_len(self) -> usize {
        match self {
            Self::ShortFixed => 1,
            Self::ShortWithSpan | Self::LongWithSpan => 2,
        }
    }

    /// Returns true for formats using the short-range codec.
    pub fn is_short(self) -> bool {
        match self {
            Self::ShortFixed | Self::ShortWithSpan => true,
            Self::LongWithSpan => false,
        }
    }
}

/// Parsed chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// `[format]`
    ShortFixed,
    /// `[format][span code]`
    ShortWithSpan {
        /// Span code of the chunk.
        span_code: SpanCode,
    },
    /// `[format][span code]`
    LongWithSpan {
        /// Span code of the chunk.
        span_code: SpanCode,
    },
}

impl Header {
    /// Builds the header a chunk of `format` and `span_code` is written with.
    pub fn new(format: Format, span_code: SpanCode) -> Self {
        match format {
            Format::ShortFixed => Self::ShortFixed,
            Format::ShortWithSpan => Self::ShortWithSpan { span_code },
            Format::LongWithSpan => Self::LongWithSpan { span_code },
        }
    }

    /// Parses and validates the header of a chunk payload.
    ///
    /// Checks structure only: the payload must be non-empty, carry a known
    /// format byte, extend past its header and reference a known span code.
    /// Damage inside the codec stream is only found while decoding.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::EmptyPayload`, `ChunkError::UnknownFormat`,
    /// `ChunkError::TooShort` or `ChunkError::UnknownSpanCode`, checked in
    /// that order.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (&format_byte, rest) = payload.split_first().ok_or(ChunkError::EmptyPayload)?;
        let format = Format::from_u8(format_byte).ok_or(ChunkError::UnknownFormat(format_byte))?;

        if payload.len() <= format.header_len() {
            return Err(ChunkError::TooShort {
                format,
                len: payload.len(),
            });
        }

        let span_code = match format {
            Format::ShortFixed => return Ok(Self::ShortFixed),
            Format::ShortWithSpan | Format::LongWithSpan => rest[0],
        };
        if !is_valid_span_code(span_code) {
            return Err(ChunkError::UnknownSpanCode(span_code));
        }
        Ok(Self::new(format, span_code))
    }

    /// Format this header declares.
    pub fn format(&self) -> Format {
        match self {
            Self::ShortFixed => Format::ShortFixed,
            Self::ShortWithSpan { .. } => Format::ShortWithSpan,
            Self::LongWithSpan { .. } => Format::LongWithSpan,
        }
    }

    /// Span code, if the format stores one.
    pub fn span_code(&self) -> Option<SpanCode> {
        match self {
            Self::ShortFixed => None,
            Self::ShortWithSpan { span_code } | Self::LongWithSpan { span_code } => {
                Some(*span_code)
            }
        }
    }

    /// Span in seconds; 0 when the format does not record one.
    pub fn span(&self) -> u32 {
        self.span_code().and_then(chunk_span).unwrap_or(0)
    }

    /// Header length in bytes.
    pub fn byte_len(&self) -> usize {
        self.format().header_len()
    }

    /// Appends the header bytes to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.format().as_u8());
        if let Some(code) = self.span_code() {
            out.push(code);
        }
    }
}
