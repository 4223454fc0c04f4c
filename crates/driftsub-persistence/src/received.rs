// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Received-sequence index.
//!
//! Durably records which (group, publisher, sequence) triples this node has
//! received, so that after any number of disconnected intervals it can ask a
//! peer only for what is still missing.

use crate::config::Config;
use crate::error::{require_id, Result, StoreError};
use driftsub::seqset::{Arithmetic, SequenceRangeSet};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Received facts by group, then publisher, as merged range sets
pub type ReceivedRanges = BTreeMap<String, BTreeMap<String, SequenceRangeSet>>;

/// Durable index of received (group, publisher, sequence) facts
///
/// Facts are append-only: created by [`add_message`](Self::add_message),
/// never mutated, never individually deleted (only bulk
/// [`reset`](Self::reset)). The (group, publisher) dimension row is created
/// lazily on first use.
///
/// Thread-safe via an instance-wide Mutex (the SQLite `Connection` is not
/// Sync); every operation, reads included, is serialized against every
/// other. Check-then-act sequences such as the duplicate probe before an
/// insert run under that single lock and are therefore atomic with respect
/// to other callers of this instance -- but not with respect to another
/// process opening the same database file.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE GroupAndPublisher (
///     GroupAndPublisherId INTEGER PRIMARY KEY AUTOINCREMENT,
///     GroupName TEXT NOT NULL,
///     PublisherNodeId TEXT NOT NULL,
///     UNIQUE (GroupName, PublisherNodeId)
/// );
/// CREATE TABLE MessageSequenceIdTable (
///     MessageSequenceId INTEGER NOT NULL,
///     GroupAndPubId INTEGER NOT NULL REFERENCES GroupAndPublisher(GroupAndPublisherId),
///     UNIQUE (MessageSequenceId, GroupAndPubId)
/// );
/// ```
pub struct ReceivedSequenceIndex {
    conn: Mutex<Connection>,
}

impl ReceivedSequenceIndex {
    /// Open (or create) the index per the given configuration
    ///
    /// The instance exclusively owns the resulting connection.
    pub fn open(config: &Config) -> Result<Self> {
        let conn = match &config.db_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        let index = Self {
            conn: Mutex::new(conn),
        };
        index.init_schema()?;
        Ok(index)
    }

    /// Open an in-memory index (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&Config::default())
    }

    /// Initialize database schema (idempotent)
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS GroupAndPublisher (
                GroupAndPublisherId INTEGER PRIMARY KEY AUTOINCREMENT,
                GroupName TEXT NOT NULL,
                PublisherNodeId TEXT NOT NULL,
                UNIQUE (GroupName, PublisherNodeId)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS MessageSequenceIdTable (
                MessageSequenceId INTEGER NOT NULL,
                GroupAndPubId INTEGER NOT NULL
                    REFERENCES GroupAndPublisher(GroupAndPublisherId),
                UNIQUE (MessageSequenceId, GroupAndPubId)
            )",
            [],
        )?;

        Ok(())
    }

    /// Record one received (group, publisher, sequence) fact
    ///
    /// Looks up or creates the (group, publisher) dimension row, then
    /// inserts the fact row. A dimension-row failure aborts before the fact
    /// is written.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for empty identifiers.
    /// - `AlreadyExists` if the exact triple is already recorded.
    /// - `Storage` / `ResourceExhausted` from the engine.
    pub fn add_message(&self, group: &str, publisher: &str, seq_id: u32) -> Result<()> {
        require_id("group name", group)?;
        require_id("publisher id", publisher)?;

        let conn = self.conn.lock().unwrap();

        if Self::fact_exists(&conn, group, publisher, seq_id)? {
            return Err(StoreError::AlreadyExists);
        }

        let pair_id = Self::find_or_create_pair(&conn, group, publisher)?;
        conn.execute(
            "INSERT INTO MessageSequenceIdTable (MessageSequenceId, GroupAndPubId)
             VALUES (?1, ?2)",
            params![i64::from(seq_id), pair_id],
        )?;

        tracing::trace!(group, publisher, seq_id, "recorded received sequence");
        Ok(())
    }

    /// Check whether the exact (group, publisher, sequence) triple is recorded
    ///
    /// Empty identifiers are `InvalidArgument`, same as on the write path.
    pub fn contains(&self, group: &str, publisher: &str, seq_id: u32) -> Result<bool> {
        require_id("group name", group)?;
        require_id("publisher id", publisher)?;
        let conn = self.conn.lock().unwrap();
        Self::fact_exists(&conn, group, publisher, seq_id)
    }

    /// Highest recorded sequence id for the pair, or None if no facts exist
    pub fn max_seq_id(&self, group: &str, publisher: &str) -> Result<Option<u32>> {
        require_id("group name", group)?;
        require_id("publisher id", publisher)?;
        let conn = self.conn.lock().unwrap();
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(m.MessageSequenceId)
             FROM MessageSequenceIdTable m
             JOIN GroupAndPublisher g ON g.GroupAndPublisherId = m.GroupAndPubId
             WHERE g.GroupName = ?1 AND g.PublisherNodeId = ?2",
            params![group, publisher],
            |row| row.get(0),
        )?;

        Ok(max.map(|v| v as u32))
    }

    /// Replay every recorded fact into per-pair sequence range sets
    ///
    /// One ordered scan over all fact rows, folding each sequence id into
    /// the linear-mode [`SequenceRangeSet`] of its (group, publisher) key.
    /// O(total facts); the snapshot is taken under the instance lock and
    /// blocks all other callers for its duration.
    pub fn by_group_and_publisher(&self) -> Result<ReceivedRanges> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT g.GroupName, g.PublisherNodeId, m.MessageSequenceId
             FROM MessageSequenceIdTable m
             JOIN GroupAndPublisher g ON g.GroupAndPublisherId = m.GroupAndPubId
             ORDER BY g.GroupName, g.PublisherNodeId, m.MessageSequenceId",
        )?;

        let mut result: ReceivedRanges = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        for row in rows {
            let (group, publisher, seq) = row?;
            let set = result
                .entry(group)
                .or_default()
                .entry(publisher)
                .or_insert_with(|| SequenceRangeSet::new(Arithmetic::Linear));
            // Fact rows are unique per (pair, seq), so the fold cannot see
            // duplicates; any error here is a genuine range failure.
            set.insert(seq as u32)?;
        }

        Ok(result)
    }

    /// Number of recorded facts
    pub fn fact_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM MessageSequenceIdTable", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    /// Bulk-delete all facts and dimension rows
    ///
    /// Facts go first: the dimension table is referenced by the fact table.
    pub fn reset(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM MessageSequenceIdTable", [])?;
        conn.execute("DELETE FROM GroupAndPublisher", [])?;
        tracing::debug!("received-sequence index reset");
        Ok(())
    }

    /// Probe for an exact fact row
    fn fact_exists(conn: &Connection, group: &str, publisher: &str, seq_id: u32) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1
                 FROM MessageSequenceIdTable m
                 JOIN GroupAndPublisher g ON g.GroupAndPublisherId = m.GroupAndPubId
                 WHERE g.GroupName = ?1 AND g.PublisherNodeId = ?2
                   AND m.MessageSequenceId = ?3",
                params![group, publisher, i64::from(seq_id)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Look up the (group, publisher) dimension row id, creating it if absent
    ///
    /// Insert-then-refetch rather than trusting last_insert_rowid: the
    /// re-find also covers the row having been created by an earlier failed
    /// attempt on the same file.
    fn find_or_create_pair(conn: &Connection, group: &str, publisher: &str) -> Result<i64> {
        let find = |conn: &Connection| -> Result<Option<i64>> {
            Ok(conn
                .query_row(
                    "SELECT GroupAndPublisherId FROM GroupAndPublisher
                     WHERE GroupName = ?1 AND PublisherNodeId = ?2",
                    params![group, publisher],
                    |row| row.get(0),
                )
                .optional()?)
        };

        if let Some(id) = find(conn)? {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO GroupAndPublisher (GroupName, PublisherNodeId) VALUES (?1, ?2)",
            params![group, publisher],
        )?;
        find(conn)?.ok_or_else(|| {
            StoreError::NotFound(format!("pair ({}, {}) after insert", group, publisher))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_contains() {
        let index = ReceivedSequenceIndex::open_in_memory().expect("open");

        index.add_message("G", "P", 5).expect("add fact");
        assert!(index.contains("G", "P", 5).expect("contains"));
        assert!(!index.contains("G", "P", 6).expect("contains"));
        assert!(!index.contains("G", "Q", 5).expect("contains"));
    }

    #[test]
    fn test_duplicate_fact_rejected() {
        let index = ReceivedSequenceIndex::open_in_memory().expect("open");

        index.add_message("G", "P", 5).expect("first add");
        assert!(matches!(
            index.add_message("G", "P", 5),
            Err(StoreError::AlreadyExists)
        ));
        assert_eq!(index.fact_count().expect("count"), 1);
    }

    #[test]
    fn test_empty_identifiers_rejected() {
        let index = ReceivedSequenceIndex::open_in_memory().expect("open");

        assert!(matches!(
            index.add_message("", "P", 1),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.add_message("G", "", 1),
            Err(StoreError::InvalidArgument(_))
        ));

        // Read paths apply the same identifier validation.
        assert!(matches!(
            index.contains("", "P", 1),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.max_seq_id("G", ""),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_max_seq_id() {
        let index = ReceivedSequenceIndex::open_in_memory().expect("open");

        assert_eq!(index.max_seq_id("G", "P").expect("max"), None);

        index.add_message("G", "P", 3).expect("add 3");
        index.add_message("G", "P", 7).expect("add 7");
        index.add_message("G", "P", 5).expect("add 5");

        assert_eq!(index.max_seq_id("G", "P").expect("max"), Some(7));
        assert_eq!(index.max_seq_id("G", "Q").expect("max"), None);
    }

    #[test]
    fn test_by_group_and_publisher_independent_sets() {
        let index = ReceivedSequenceIndex::open_in_memory().expect("open");

        for seq in [1, 2, 3, 7] {
            index.add_message("G1", "P1", seq).expect("add G1/P1");
        }
        index.add_message("G2", "P2", 10).expect("add G2/P2");

        let all = index.by_group_and_publisher().expect("scan");
        assert_eq!(all.len(), 2);

        let s1 = &all["G1"]["P1"];
        assert_eq!(s1.range_count(), 2); // 1-3 merged, 7 alone
        assert!(s1.contains(2));
        assert!(!s1.contains(10));

        let s2 = &all["G2"]["P2"];
        assert_eq!(s2.range_count(), 1);
        assert!(s2.contains(10));
        assert!(!s2.contains(1));
    }

    #[test]
    fn test_dimension_row_reused_across_facts() {
        let index = ReceivedSequenceIndex::open_in_memory().expect("open");

        index.add_message("G", "P", 1).expect("add 1");
        index.add_message("G", "P", 2).expect("add 2");

        let all = index.by_group_and_publisher().expect("scan");
        assert_eq!(all.len(), 1);
        assert_eq!(all["G"].len(), 1);
        assert_eq!(all["G"]["P"].total(), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let index = ReceivedSequenceIndex::open_in_memory().expect("open");

        index.add_message("G", "P", 1).expect("add");
        index.reset().expect("reset");

        assert_eq!(index.fact_count().expect("count"), 0);
        assert!(!index.contains("G", "P", 1).expect("contains"));
        assert!(index.by_group_and_publisher().expect("scan").is_empty());

        // The index is fully usable after a reset.
        index.add_message("G", "P", 1).expect("re-add");
        assert!(index.contains("G", "P", 1).expect("contains"));
    }
}
