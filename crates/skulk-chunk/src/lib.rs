//! Skulk Chunk - chunk storage and decoding for the Skulk time series store
//!
//! This crate packs a bounded window of timestamped samples into a compact,
//! self-describing payload, validates payloads loaded from storage, and
//! lazily decodes them into point streams for the query path.
//!
//! # Components
//!
//! - [`tsz`]: Gorilla-style compression, in short-range and long-range variants
//! - [`Chunk`]: Accumulator that compresses samples of one span
//! - [`IterGen`]: Validated `(t0, payload)` pair producing decode iterators
//! - [`IterGensAsc`]: Ascending order over IterGens for chronological stitching
//! - [`SeriesWriter`]: Rolls chunks over at span boundaries for one stream
//!
//! # Example
//!
//! ```rust
//! use skulk_chunk::{Chunk, IterGen, Point};
//!
//! let t0 = 1_500_000_000 - 1_500_000_000 % 7200;
//! let mut chunk = Chunk::new(t0, 18).unwrap(); // 2h span
//! chunk.push(t0, 1.0).unwrap();
//! chunk.push(t0 + 60, 1.5).unwrap();
//! let payload = chunk.finish().unwrap();
//!
//! // later, after a round trip through storage
//! let itergen = IterGen::new(t0, payload).unwrap();
//! let points: Vec<Point> = itergen.get().unwrap().collect::<Result<_, _>>().unwrap();
//! assert_eq!(points, vec![Point::new(t0, 1.0), Point::new(t0 + 60, 1.5)]);
//! ```

#![deny(missing_docs)]

pub mod chunk;
pub mod error;
pub mod tsz;

pub use chunk::{
    sort_ascending, Chunk, ChunkIter, Format, IterGen, IterGensAsc, SeriesWriter, SpanCode,
    WriterConfig,
};
pub use error::{ChunkError, Result};
pub use tsz::Point;
