//! Error and Result types for chunk encoding and decoding.

use crate::chunk::Format;
use thiserror::Error;

/// A convenience `Result` type for chunk operations.
pub type Result<T> = std::result::Result<T, ChunkError>;

/// The error type for chunk operations.
///
/// Payload validation errors (`EmptyPayload`, `UnknownFormat`, `TooShort`,
/// `UnknownSpanCode`) mean the bytes must be discarded. `CorruptStream` is only
/// discovered while decoding and affects a single iterator. The remaining
/// variants report misuse of the chunk accumulator by its writer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// Chunk payload has no bytes at all.
    #[error("Chunk payload is empty")]
    EmptyPayload,

    /// Format byte at offset 0 is not a known chunk format.
    #[error("Unrecognized chunk format: {0:#04x}")]
    UnknownFormat(u8),

    /// Payload does not extend past its declared header.
    #[error("Chunk is too short: {len} bytes for format {format:?}")]
    TooShort {
        /// Format declared by the payload.
        format: Format,
        /// Actual payload length in bytes.
        len: usize,
    },

    /// Span code byte does not reference an entry of the span table.
    #[error("Corrupt data, chunk span code {0} is not known")]
    UnknownSpanCode(u8),

    /// Codec bit stream ended early or holds an impossible encoding.
    #[error("Corrupt chunk stream: {0}")]
    CorruptStream(String),

    /// Span code passed to a chunk constructor is out of table bounds.
    #[error("Invalid span code: {0}")]
    InvalidSpan(u8),

    /// Span does not fit the window of a short-range format.
    #[error("Span {span}s exceeds the {max}s window of the short-range codec")]
    SpanTooLong {
        /// Requested span in seconds.
        span: u32,
        /// Largest span the format supports.
        max: u32,
    },

    /// Sample timestamp is not strictly after the previous one, or before `T0`.
    #[error("Out of order sample: timestamp {ts} is not after {prev}")]
    OutOfOrder {
        /// Rejected timestamp.
        ts: u32,
        /// Timestamp the sample had to exceed.
        prev: u32,
    },

    /// Sample timestamp falls at or after the end of the chunk's span.
    #[error("Sample timestamp {ts} is outside the chunk span ending at {end}")]
    OutsideSpan {
        /// Rejected timestamp.
        ts: u32,
        /// Exclusive end of the chunk span.
        end: u32,
    },

    /// Chunk no longer accepts samples.
    #[error("Chunk is closed")]
    ChunkClosed,

    /// `finish` was already called on this chunk.
    #[error("Chunk was already finished")]
    AlreadyFinished,
}
