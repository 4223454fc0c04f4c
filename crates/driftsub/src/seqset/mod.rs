// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Sequence Range Bookkeeping
//!
//! Tracks the set of received per-publisher sequence numbers as merged
//! disjoint inclusive ranges, so the missing numbers can be derived by
//! complement and requested from the next peer that comes into contact.
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | `SeqRange` | Inclusive `[begin, end]` range over `u32` sequences |
//! | `Arithmetic` | Comparison strategy: linear or serial (wrap-around) |
//! | `SequenceRangeSet` | Sorted, merged, disjoint list of ranges |
//!
//! ## Arithmetic Modes
//!
//! Per-publisher sequence numbers increase monotonically but live in a
//! 32-bit space; long-lived publishers eventually wrap. `Arithmetic::Serial`
//! orders values RFC-1982 style modulo 2^32 so that `0xFFFF_FFFE < 1`, and
//! permits a range to span the wrap point. `Arithmetic::Linear` is plain
//! integer ordering for callers that reset state before a wrap can occur.

mod range;
mod set;

pub use range::SeqRange;
pub use set::{Arithmetic, SequenceRangeSet};
