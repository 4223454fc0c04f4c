// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # driftsub-persistence - Durable Replication Bookkeeping
//!
//! SQLite-backed bookkeeping for a disruption-tolerant pub/sub node. Where
//! the core `driftsub` crate keeps volatile advertisement state, this crate
//! records the facts that must survive a restart:
//!
//! - **ReceivedSequenceIndex** -- which (group, publisher, sequence) triples
//!   have been received, replayable into per-pair
//!   [`SequenceRangeSet`](driftsub::SequenceRangeSet)s for gap computation.
//! - **TransmissionHistory** -- which targets each message was already
//!   forwarded to, so the same message is never flooded twice.
//!
//! # Architecture
//!
//! ```text
//! scheduler / dissemination layer (out of scope)
//!   +-- ReceivedSequenceIndex   (own Connection, own Mutex)
//!   +-- TransmissionHistory     (own Connection, own Mutex)
//!   +-- SubscriptionTable       (driftsub, in-memory)
//! ```
//!
//! Both stores are passive, synchronous objects: every public operation may
//! block the caller for the duration of the storage call, and each instance
//! serializes all of its operations behind one instance-wide mutex. No two
//! components share a connection.
//!
//! # Example
//!
//! ```
//! use driftsub_persistence::ReceivedSequenceIndex;
//!
//! let index = ReceivedSequenceIndex::open_in_memory().unwrap();
//! index.add_message("chat", "nodeA", 5).unwrap();
//! assert!(index.contains("chat", "nodeA", 5).unwrap());
//! assert_eq!(index.max_seq_id("chat", "nodeA").unwrap(), Some(5));
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod received;

pub use config::Config;
pub use error::{Result, StoreError};
pub use history::TransmissionHistory;
pub use received::ReceivedSequenceIndex;
