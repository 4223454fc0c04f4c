// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inclusive sequence range value type.
//!
//! Provides semantic constructors and queries for `[begin, end]` ranges over
//! the 32-bit sequence space, documenting the boundary conventions used by
//! the replication bookkeeping layer.

/// Inclusive sequence number range `[begin, end]`
///
/// # Boundary Conventions
///
/// - **Inclusive on both ends**: `SeqRange { begin: 3, end: 5 }` contains
///   3, 4 and 5. Wire formats for missing-fragment requests in DTN
///   protocols list first and last id, so inclusive bounds avoid +1/-1
///   churn at the edges.
/// - **Wrap encoding**: `begin > end` numerically denotes a range that
///   wraps through `u32::MAX` (serial arithmetic only). Example:
///   `SeqRange { begin: 0xFFFF_FFFE, end: 1 }` contains four values.
/// - **Adjacency**: range `A` touches range `B` when
///   `A.end.wrapping_add(1) == B.begin`; adjacent ranges must be merged by
///   the owning set.
///
/// Whether a given `begin > end` pair is a wrap or an error depends on the
/// arithmetic mode and is validated by [`super::SequenceRangeSet`], not by
/// this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqRange {
    /// First sequence number in the range (inclusive).
    pub begin: u32,
    /// Last sequence number in the range (inclusive).
    pub end: u32,
}

impl SeqRange {
    /// Create an inclusive range `[begin, end]`
    ///
    /// No validation is performed here; `begin > end` is a wrap in serial
    /// mode and invalid in linear mode (rejected by the owning set).
    pub fn new(begin: u32, end: u32) -> Self {
        Self { begin, end }
    }

    /// Create a single-element range `[seq, seq]`
    pub fn single(seq: u32) -> Self {
        Self {
            begin: seq,
            end: seq,
        }
    }

    /// Number of sequence numbers in the range (wrap-aware)
    ///
    /// A wrapped range counts the values from `begin` up through `u32::MAX`
    /// plus those from 0 up through `end`. The full-circle case
    /// (`end.wrapping_sub(begin) == u32::MAX`) yields 2^32, which is why
    /// the return type is `u64`.
    pub fn len(&self) -> u64 {
        u64::from(self.end.wrapping_sub(self.begin)) + 1
    }

    /// Check if the range holds exactly one sequence number
    pub fn is_single(&self) -> bool {
        self.begin == self.end
    }

    /// Always false (an inclusive range holds at least one value)
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check if the range wraps through `u32::MAX`
    pub fn is_wrapped(&self) -> bool {
        self.begin > self.end
    }
}

impl std::fmt::Display for SeqRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.begin)
        } else {
            write!(f, "{}-{}", self.begin, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_range_new() {
        let r = SeqRange::new(10, 20);
        assert_eq!(r.begin, 10);
        assert_eq!(r.end, 20);
        assert_eq!(r.len(), 11);
        assert!(!r.is_single());
        assert!(!r.is_wrapped());
    }

    #[test]
    fn test_seq_range_single() {
        let r = SeqRange::single(42);
        assert!(r.is_single());
        assert_eq!(r.len(), 1);
        assert!(!r.is_empty());
    }

    #[test]
    fn test_seq_range_wrapped_len() {
        // 0xFFFF_FFFE, 0xFFFF_FFFF, 0, 1 -> 4 values
        let r = SeqRange::new(0xFFFF_FFFE, 1);
        assert!(r.is_wrapped());
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn test_seq_range_full_circle_len() {
        // begin = end + 1 (mod 2^32) covers the entire space
        let r = SeqRange::new(1, 0);
        assert_eq!(r.len(), 1 << 32);
    }

    #[test]
    fn test_seq_range_display() {
        assert_eq!(SeqRange::new(2, 12).to_string(), "2-12");
        assert_eq!(SeqRange::single(7).to_string(), "7");
    }
}
