// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Disjoint inclusive-range set with merge-on-insert and split-on-remove.
//!
//! Reader-side bookkeeping for received sequence numbers: the set holds the
//! received side, the complement is the NACK/request list. Adjacent and
//! overlapping ranges are merged automatically so the list stays minimal.

use super::SeqRange;
use crate::{Error, Result};

/// Half of the 32-bit sequence space (2^31 values)
///
/// A serial-mode range whose element count exceeds this is ambiguous (the
/// short way around the circle is the other direction) and is rejected.
const HALF_SPACE: u64 = 0x8000_0000;

/// Comparison strategy for the 32-bit sequence space
///
/// # Modes
///
/// - **Linear**: ordinary integer ordering; a range must have
///   `begin <= end` and nothing is adjacent past `u32::MAX`.
/// - **Serial**: RFC-1982 serial number arithmetic; the space is circular
///   on `[0, 2^32 - 1]`, `u32::MAX` is adjacent to 0, and a range may wrap
///   (`begin > end` numerically). Requested ranges spanning more than half
///   the space are rejected rather than guessing a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    /// Plain integer ordering, no wrap.
    Linear,
    /// Serial (modular) ordering on the 2^32 circle.
    Serial,
}

impl Arithmetic {
    /// Strict "a before b" under this mode's ordering
    ///
    /// Serial comparison is only meaningful when the distance between the
    /// values is under half the space; the set's validation keeps stored
    /// ranges within that window relative to their neighbors.
    fn precedes(self, a: u32, b: u32) -> bool {
        match self {
            Arithmetic::Linear => a < b,
            Arithmetic::Serial => a != b && u64::from(b.wrapping_sub(a)) < HALF_SPACE,
        }
    }

    /// Successor of a sequence number, or None at the top of a linear space
    fn succ(self, seq: u32) -> Option<u32> {
        match self {
            Arithmetic::Linear => seq.checked_add(1),
            Arithmetic::Serial => Some(seq.wrapping_add(1)),
        }
    }

    /// Validate a requested inclusive range for this mode
    fn validate(self, begin: u32, end: u32) -> Result<()> {
        match self {
            Arithmetic::Linear => {
                if begin > end {
                    return Err(Error::InvalidRange(format!(
                        "inverted bounds {}-{} in linear mode",
                        begin, end
                    )));
                }
            }
            Arithmetic::Serial => {
                let span = u64::from(end.wrapping_sub(begin)) + 1;
                if span > HALF_SPACE {
                    return Err(Error::InvalidRange(format!(
                        "range {}-{} spans {} values, more than half the sequence space",
                        begin, end, span
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Offset of `seq` from the start of `range`, on the wrapping circle
///
/// `seq` lies inside `range` iff its offset does not exceed the range's own
/// end offset. Works for wrapped and non-wrapped ranges alike, which keeps
/// the overlap logic identical across arithmetic modes.
fn offset(range: &SeqRange, seq: u32) -> u32 {
    seq.wrapping_sub(range.begin)
}

/// Check if `range` contains `seq` (wrap-aware)
fn range_contains(range: &SeqRange, seq: u32) -> bool {
    offset(range, seq) <= offset(range, range.end)
}

/// Check if two inclusive ranges share at least one value (wrap-aware)
fn ranges_overlap(a: &SeqRange, b: &SeqRange) -> bool {
    range_contains(a, b.begin) || range_contains(b, a.begin)
}

/// Ordered set of disjoint inclusive sequence ranges
///
/// Maintains the minimal ascending list of merged ranges representing the
/// sequence numbers received so far for one (group, publisher) stream.
///
/// # Invariants
///
/// - Ranges are pairwise disjoint.
/// - No two neighbors are adjacent (adjacency implies merge on insert).
/// - The list is ascending by `begin` under the configured [`Arithmetic`].
///
/// # Complexity
///
/// All operations are O(n) scans over the sorted `Vec` of ranges; no index
/// is maintained. Gap lists stay short in practice (bounded by loss and
/// reordering windows), the same trade the reliability gap tracker makes.
///
/// # Iteration
///
/// A single forward cursor: [`first`](Self::first) resets it and yields the
/// lowest range, [`next_range`](Self::next_range) advances. The cursor is
/// not re-entrant and any mutation resets it.
///
/// # Example
///
/// ```
/// use driftsub::seqset::{Arithmetic, SequenceRangeSet};
///
/// let mut set = SequenceRangeSet::new(Arithmetic::Linear);
/// set.insert_range(1, 8).unwrap();
/// set.insert_range(10, 12).unwrap();
/// set.insert(9).unwrap(); // bridges both into 1..=12
/// assert_eq!(set.range_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceRangeSet {
    /// Comparison strategy (fixed at construction).
    mode: Arithmetic,

    /// Sorted, merged, disjoint ranges.
    ranges: Vec<SeqRange>,

    /// Forward iteration cursor (index of the next range to yield).
    cursor: usize,
}

impl SequenceRangeSet {
    /// Create an empty set using the given arithmetic mode
    pub fn new(mode: Arithmetic) -> Self {
        Self {
            mode,
            ranges: Vec::new(),
            cursor: 0,
        }
    }

    /// Arithmetic mode this set was created with
    pub fn mode(&self) -> Arithmetic {
        self.mode
    }

    /// Insert a single sequence number
    ///
    /// Equivalent to [`insert_range`](Self::insert_range) with
    /// `begin == end`.
    pub fn insert(&mut self, seq: u32) -> Result<()> {
        self.insert_range(seq, seq)
    }

    /// Insert an inclusive range, merging with anything it overlaps or touches
    ///
    /// Merging is transitive: inserting a range that bridges two previously
    /// separate ranges collapses all of them into one (e.g. inserting 9
    /// between 1-8 and 10-12 yields 1-12).
    ///
    /// # Errors
    ///
    /// - `Error::DuplicateRange` if the requested span is already fully
    ///   contained (the set is left untouched).
    /// - `Error::InvalidRange` for inverted linear bounds or a serial span
    ///   over half the space.
    pub fn insert_range(&mut self, begin: u32, end: u32) -> Result<()> {
        self.mode.validate(begin, end)?;
        let new = SeqRange::new(begin, end);

        // Duplicate insert is reported, not silently merged. A fully
        // contained span always sits inside a single existing range
        // (neighbors are never adjacent).
        for r in &self.ranges {
            if range_contains(r, begin)
                && range_contains(r, end)
                && offset(r, begin) <= offset(r, end)
            {
                return Err(Error::DuplicateRange);
            }
        }

        // Collect every existing range the new one overlaps or touches.
        let touching: Vec<usize> = self
            .ranges
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                ranges_overlap(&new, r)
                    || self.mode.succ(new.end) == Some(r.begin)
                    || self.mode.succ(r.end) == Some(new.begin)
            })
            .map(|(i, _)| i)
            .collect();

        let merged = if touching.is_empty() {
            new
        } else {
            // Touched ranges are consecutive in the sorted list; the merged
            // range starts at whichever of {new, first touched} reaches
            // further back, and ends at whichever reaches further forward.
            let first = self.ranges[touching[0]];
            let last = self.ranges[*touching.last().unwrap_or(&touching[0])];
            let merged_begin = if range_contains(&new, first.begin)
                || self.mode.succ(new.end) == Some(first.begin)
            {
                new.begin
            } else {
                first.begin
            };
            // Both candidate ends sit inside the contiguous union, so the
            // larger offset from the merged begin is the later one.
            let merged_end =
                if new.end.wrapping_sub(merged_begin) >= last.end.wrapping_sub(merged_begin) {
                    new.end
                } else {
                    last.end
                };
            if touching.len() > 1 {
                log::debug!(
                    "SequenceRangeSet: insert {} bridged {} ranges into {}-{}",
                    new,
                    touching.len(),
                    merged_begin,
                    merged_end
                );
            }
            for i in touching.iter().rev() {
                self.ranges.remove(*i);
            }
            SeqRange::new(merged_begin, merged_end)
        };

        let pos = self
            .ranges
            .iter()
            .position(|r| self.mode.precedes(merged.begin, r.begin))
            .unwrap_or(self.ranges.len());
        self.ranges.insert(pos, merged);
        self.cursor = 0;
        Ok(())
    }

    /// Remove a single sequence number
    pub fn remove(&mut self, seq: u32) -> Result<()> {
        self.remove_range(seq, seq)
    }

    /// Remove an inclusive range, splitting or shrinking whatever it hits
    ///
    /// Interior removal splits a range in two, edge removal shrinks it,
    /// exact cover deletes it. Removing values that are not present is a
    /// safe no-op.
    ///
    /// # Errors
    ///
    /// `Error::InvalidRange` only; removal itself cannot fail.
    pub fn remove_range(&mut self, begin: u32, end: u32) -> Result<()> {
        self.mode.validate(begin, end)?;
        let removal = SeqRange::new(begin, end);

        let mut updated = Vec::with_capacity(self.ranges.len() + 1);
        for r in &self.ranges {
            if !ranges_overlap(&removal, r) {
                updated.push(*r);
                continue;
            }
            // Left survivor: the part of r strictly before the removal.
            if range_contains(r, begin) && begin != r.begin {
                updated.push(SeqRange::new(r.begin, begin.wrapping_sub(1)));
            }
            // Right survivor: the part of r strictly after the removal.
            if range_contains(r, end) && end != r.end {
                updated.push(SeqRange::new(end.wrapping_add(1), r.end));
            }
        }

        self.ranges = updated;
        self.cursor = 0;
        Ok(())
    }

    /// Check membership of a single sequence number
    pub fn contains(&self, seq: u32) -> bool {
        self.ranges.iter().any(|r| range_contains(r, seq))
    }

    /// True when the set holds no sequence numbers
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of disjoint ranges currently held
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Total number of sequence numbers contained across all ranges
    pub fn total(&self) -> u64 {
        self.ranges.iter().map(SeqRange::len).sum()
    }

    /// Snapshot of the merged, ascending, disjoint ranges
    pub fn ranges(&self) -> &[SeqRange] {
        &self.ranges
    }

    /// Reset the cursor and yield the first (lowest) range
    ///
    /// Must be called before each iteration pass; mutation also resets the
    /// cursor.
    pub fn first(&mut self) -> Option<SeqRange> {
        self.cursor = 0;
        self.next_range()
    }

    /// Yield the next range after the cursor, advancing it
    ///
    /// Returns None at the end of the pass (and stays there until
    /// [`first`](Self::first) resets).
    pub fn next_range(&mut self) -> Option<SeqRange> {
        let r = self.ranges.get(self.cursor).copied();
        if r.is_some() {
            self.cursor += 1;
        }
        r
    }

    /// Drop all ranges
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.cursor = 0;
    }
}
