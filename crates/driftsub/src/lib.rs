// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # driftsub - Replication Bookkeeping for Disruption-Tolerant Pub/Sub
//!
//! Core state-tracking primitives for a group-based publish/subscribe node
//! operating over a disruption-tolerant network (DTN). Peers connect
//! intermittently, so a node must remember -- without a live connection to
//! anyone -- which sequence numbers it already holds and which remote nodes
//! are currently interested in each group.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `seqset` | Disjoint inclusive-range set over the 32-bit sequence space |
//! | `subscriptions` | Per-group advertisement table with liveness aging |
//!
//! ## Overview
//!
//! `seqset::SequenceRangeSet` answers "which sequence numbers am I missing"
//! by keeping received numbers as merged intervals; the complement is the
//! request list for the next opportunistic contact. It supports ordinary
//! linear ordering and serial (wrap-around) arithmetic on the
//! `[0, 2^32 - 1]` circle.
//!
//! `subscriptions::SubscriptionTable` tracks which remote nodes subscribed
//! to a group and via which multi-hop forwarding paths, expiring entries
//! whose liveness evidence has gone stale and cascading cleanup when a
//! relay node is declared dead.
//!
//! Durable bookkeeping (received-fact index, transmission history) lives in
//! the companion `driftsub-persistence` crate.
//!
//! ## Example
//!
//! ```
//! use driftsub::seqset::{Arithmetic, SequenceRangeSet};
//!
//! let mut set = SequenceRangeSet::new(Arithmetic::Linear);
//! set.insert_range(2, 4).unwrap();
//! set.insert(5).unwrap(); // adjacent: merges into 2..=5
//! assert!(set.contains(3));
//! assert_eq!(set.range_count(), 1);
//! ```

pub mod seqset;
pub mod subscriptions;

pub use seqset::{Arithmetic, SeqRange, SequenceRangeSet};
pub use subscriptions::SubscriptionTable;

/// Errors returned by core bookkeeping operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Range arguments are malformed: inverted bounds in linear mode, or a
    /// serial-mode span covering more than half the sequence space (the
    /// direction around the circle would be ambiguous).
    InvalidRange(String),
    /// The inserted value or range is already fully contained in the set.
    DuplicateRange,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
            Error::DuplicateRange => write!(f, "Range already contained"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
