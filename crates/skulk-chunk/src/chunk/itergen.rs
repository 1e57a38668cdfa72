//! IterGen: a finished chunk payload paired with its start timestamp.
//!
//! An `IterGen` is immutable and cheap to clone (the payload is reference
//! counted), so it can be handed to any number of readers. Each call to
//! [`IterGen::get`] produces a fresh [`ChunkIter`] that decodes from its own
//! copy of the codec stream.

use super::format::{Format, Header};
use crate::error::{ChunkError, Result};
use crate::tsz::{Iter4h, IterLong, Point};
use bytes::Bytes;
use tracing::warn;

/// Start timestamp and payload of a finished chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterGen {
    t0: u32,
    /// `None` only for a malformed payload built with [`IterGen::new_unchecked`].
    header: Option<Header>,
    bytes: Bytes,
}

impl IterGen {
    /// Creates an IterGen after crude validation of the payload header.
    ///
    /// # Errors
    ///
    /// Returns the first header violation found by [`Header::parse`]. The
    /// codec stream itself is not inspected.
    pub fn new(t0: u32, bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        match Header::parse(&bytes) {
            Ok(header) => Ok(Self {
                t0,
                header: Some(header),
                bytes,
            }),
            Err(e) => {
                warn!(t0, len = bytes.len(), error = %e, "rejecting chunk payload");
                Err(e)
            }
        }
    }

    /// Creates an IterGen without rejecting the payload.
    ///
    /// Meant for payloads produced by [`Chunk::finish`](super::Chunk::finish)
    /// or cloned from an already validated IterGen. A malformed payload is
    /// still accepted: [`IterGen::format`] then returns `None`,
    /// [`IterGen::span`] returns 0 and [`IterGen::get`] returns the header
    /// error.
    pub fn new_unchecked(t0: u32, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            t0,
            header: Header::parse(&bytes).ok(),
            bytes,
        }
    }

    /// Start timestamp of the chunk.
    pub fn t0(&self) -> u32 {
        self.t0
    }

    /// Parsed payload header; `None` for a malformed unchecked payload.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Format declared by byte 0 of the payload.
    ///
    /// Always `Some` for an IterGen built with [`IterGen::new`].
    pub fn format(&self) -> Option<Format> {
        self.header.as_ref().map(Header::format)
    }

    /// Span of the chunk in seconds; 0 for [`Format::ShortFixed`], which
    /// does not record it, and for a malformed unchecked payload.
    pub fn span(&self) -> u32 {
        self.header.as_ref().map_or(0, Header::span)
    }

    /// Exclusive end of the interval covered by this chunk.
    pub fn end_ts(&self) -> u32 {
        self.t0.saturating_add(self.span())
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The full payload, header included.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Creates a decoder over the chunk's samples.
    ///
    /// The decoder receives a private copy of the codec stream; the payload
    /// held by this IterGen is never touched while decoding.
    ///
    /// # Errors
    ///
    /// Returns the header error for a malformed payload built with
    /// [`IterGen::new_unchecked`], or `ChunkError::CorruptStream` if a
    /// short-range stream cannot hold its `T0`.
    pub fn get(&self) -> Result<ChunkIter> {
        let header = match self.header {
            Some(header) => header,
            None => Header::parse(&self.bytes)?,
        };
        let stream = self.bytes[header.byte_len()..].to_vec();
        let iter = match header {
            Header::ShortFixed | Header::ShortWithSpan { .. } => {
                ChunkIter::Short(Iter4h::new(stream)?)
            }
            Header::LongWithSpan { .. } => ChunkIter::Long(IterLong::new(self.t0, stream)),
        };
        Ok(iter)
    }
}

/// Single-pass decoder over one chunk.
///
/// Yields points in timestamp order. A `ChunkError::CorruptStream` item ends
/// the iteration.
#[derive(Debug, Clone)]
pub enum ChunkIter {
    /// Short-range stream.
    Short(Iter4h),
    /// Long-range stream.
    Long(IterLong),
}

impl Iterator for ChunkIter {
    type Item = Result<Point>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self {
            Self::Short(iter) => iter.next(),
            Self::Long(iter) => iter.next(),
        };
        if let Some(Err(ChunkError::CorruptStream(reason))) = &item {
            warn!(%reason, "corrupt chunk stream");
        }
        item
    }
}
