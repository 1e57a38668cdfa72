//! Ascending order over IterGens, for stitching chunks into one stream.

use super::itergen::{ChunkIter, IterGen};
use crate::error::Result;
use crate::tsz::Point;
use std::ops::{Deref, DerefMut};

/// Sorts IterGens by `T0`, oldest first.
///
/// The sort is stable, so IterGens sharing a `T0` keep their relative order.
pub fn sort_ascending(itergens: &mut [IterGen]) {
    itergens.sort_by_key(IterGen::t0);
}

/// A collection of IterGens ordered by `T0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterGensAsc(Vec<IterGen>);

impl IterGensAsc {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects `itergens` and sorts them by `T0`.
    pub fn from_unsorted(itergens: impl IntoIterator<Item = IterGen>) -> Self {
        let mut sorted = Self(itergens.into_iter().collect());
        sorted.sort();
        sorted
    }

    /// Sorts by `T0`, keeping the relative order of equal keys.
    pub fn sort(&mut self) {
        sort_ascending(&mut self.0);
    }

    /// Returns true if every IterGen starts no earlier than its predecessor.
    pub fn is_sorted(&self) -> bool {
        self.0.windows(2).all(|w| w[0].t0() <= w[1].t0())
    }

    /// Finds the first adjacent pair whose intervals overlap.
    ///
    /// Returns the index of the earlier IterGen of the pair, i.e. the first
    /// `i` with `self[i].end_ts() > self[i + 1].t0()`. IterGens in
    /// [`Format::ShortFixed`](super::Format::ShortFixed) report a zero span and
    /// so never overlap their successor; the same holds for IterGens whose
    /// unchecked payload has a malformed header.
    pub fn find_overlap(&self) -> Option<usize> {
        self.0
            .windows(2)
            .position(|w| w[0].end_ts() > w[1].t0())
    }

    /// Lazily decodes all chunks, in collection order, into one point stream.
    ///
    /// A chunk that fails to decode yields its error as one item; the
    /// stream then continues with the next chunk.
    pub fn points(&self) -> MergedPoints {
        MergedPoints::new(self.0.clone())
    }

    /// Returns the IterGens.
    pub fn into_inner(self) -> Vec<IterGen> {
        self.0
    }
}

impl Deref for IterGensAsc {
    type Target = [IterGen];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for IterGensAsc {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<IterGen>> for IterGensAsc {
    fn from(itergens: Vec<IterGen>) -> Self {
        Self(itergens)
    }
}

impl FromIterator<IterGen> for IterGensAsc {
    fn from_iter<I: IntoIterator<Item = IterGen>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for IterGensAsc {
    type Item = IterGen;
    type IntoIter = std::vec::IntoIter<IterGen>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Point stream over a sequence of chunks, decoded one chunk at a time.
#[derive(Debug)]
pub struct MergedPoints {
    pending: std::vec::IntoIter<IterGen>,
    current: Option<ChunkIter>,
}

impl MergedPoints {
    fn new(itergens: Vec<IterGen>) -> Self {
        Self {
            pending: itergens.into_iter(),
            current: None,
        }
    }
}

impl Iterator for MergedPoints {
    type Item = Result<Point>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(iter) = self.current.as_mut() {
                if let Some(item) = iter.next() {
                    return Some(item);
                }
                self.current = None;
            }

            let itergen = self.pending.next()?;
            match itergen.get() {
                Ok(iter) => self.current = Some(iter),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
