// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transmission history store.
//!
//! Durably records which target nodes each message has already been
//! forwarded to. The scheduler consults it before forwarding so the same
//! message never floods the same peer twice, even across restarts.

use crate::config::Config;
use crate::error::{require_id, Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;
use std::time::Duration;

/// Durable many-to-many record of message -> forwarded-to targets
///
/// Message and target identifiers are dimension rows created lazily on
/// first use; the join table carries the actual transmission facts. Targets
/// are shared across messages and survive message deletion.
///
/// Thread-safe via an instance-wide Mutex; every operation is serialized
/// against every other, and the multi-statement sequences (find-or-create,
/// two-phase delete) are atomic with respect to other callers of this
/// instance.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE MessageIDs (
///     MsgRowId INTEGER PRIMARY KEY AUTOINCREMENT,
///     MsgId TEXT NOT NULL,
///     UNIQUE (MsgId)
/// );
/// CREATE TABLE TargetIDs (
///     TargetRowID INTEGER PRIMARY KEY AUTOINCREMENT,
///     TargetID TEXT NOT NULL,
///     UNIQUE (TargetID)
/// );
/// CREATE TABLE MessageTargets (
///     MsgRowId INTEGER NOT NULL REFERENCES MessageIDs(MsgRowId),
///     TargetRowID INTEGER NOT NULL REFERENCES TargetIDs(TargetRowID),
///     UNIQUE (MsgRowId, TargetRowID)
/// );
/// ```
///
/// # Delete Ordering
///
/// No foreign-key cascade is assumed: [`delete_message`](Self::delete_message)
/// and [`reset`](Self::reset) delete join rows strictly before the
/// dimension rows they reference, and abort before touching dimension rows
/// if the join delete fails. Dangling join rows are never left behind.
pub struct TransmissionHistory {
    conn: Mutex<Connection>,
}

impl TransmissionHistory {
    /// Open (or create) the history per the given configuration
    pub fn open(config: &Config) -> Result<Self> {
        let conn = match &config.db_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        let history = Self {
            conn: Mutex::new(conn),
        };
        history.init_schema()?;
        Ok(history)
    }

    /// Open an in-memory history (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&Config::default())
    }

    /// Initialize database schema (idempotent)
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS MessageIDs (
                MsgRowId INTEGER PRIMARY KEY AUTOINCREMENT,
                MsgId TEXT NOT NULL,
                UNIQUE (MsgId)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS TargetIDs (
                TargetRowID INTEGER PRIMARY KEY AUTOINCREMENT,
                TargetID TEXT NOT NULL,
                UNIQUE (TargetID)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS MessageTargets (
                MsgRowId INTEGER NOT NULL REFERENCES MessageIDs(MsgRowId),
                TargetRowID INTEGER NOT NULL REFERENCES TargetIDs(TargetRowID),
                UNIQUE (MsgRowId, TargetRowID)
            )",
            [],
        )?;

        Ok(())
    }

    /// Record that `msg_id` was forwarded to `target_id`
    ///
    /// Idempotent at the entity level: message and target dimension rows
    /// are found or created. The join insert itself is not idempotent -- a
    /// duplicate surfaces as `AlreadyExists` (uniqueness constraint);
    /// callers wanting idempotent join semantics check
    /// [`has_target`](Self::has_target) first.
    pub fn add_message_target(&self, msg_id: &str, target_id: &str) -> Result<()> {
        require_id("message id", msg_id)?;
        require_id("target id", target_id)?;

        let conn = self.conn.lock().unwrap();

        let msg_row = Self::find_or_create_row(
            &conn,
            "SELECT MsgRowId FROM MessageIDs WHERE MsgId = ?1",
            "INSERT INTO MessageIDs (MsgId) VALUES (?1)",
            msg_id,
        )?;
        let target_row = Self::find_or_create_row(
            &conn,
            "SELECT TargetRowID FROM TargetIDs WHERE TargetID = ?1",
            "INSERT INTO TargetIDs (TargetID) VALUES (?1)",
            target_id,
        )?;

        conn.execute(
            "INSERT INTO MessageTargets (MsgRowId, TargetRowID) VALUES (?1, ?2)",
            params![msg_row, target_row],
        )?;

        tracing::trace!(msg_id, target_id, "recorded transmission");
        Ok(())
    }

    /// Targets the message has been sent to (storage order, empty if none)
    ///
    /// Empty identifiers are `InvalidArgument` on read paths too, same as
    /// on the write path.
    pub fn target_list(&self, msg_id: &str) -> Result<Vec<String>> {
        require_id("message id", msg_id)?;
        let conn = self.conn.lock().unwrap();
        Self::targets_of(&conn, msg_id)
    }

    /// Messages that have been sent to the target (storage order)
    pub fn message_list(&self, target_id: &str) -> Result<Vec<String>> {
        require_id("target id", target_id)?;
        let conn = self.conn.lock().unwrap();
        Self::messages_to(&conn, target_id)
    }

    /// Messages sent to either of two nodes, duplicates removed
    ///
    /// Set-union of the per-node lists, taken under one lock so the two
    /// scans see the same state. Equal ids degenerate to the
    /// single-argument form. Order is the target's list first, then the
    /// forwarder's unseen entries.
    pub fn message_list_via(&self, target_id: &str, forwarder_id: &str) -> Result<Vec<String>> {
        require_id("target id", target_id)?;
        require_id("forwarder id", forwarder_id)?;
        let conn = self.conn.lock().unwrap();

        let mut messages = Self::messages_to(&conn, target_id)?;
        if target_id != forwarder_id {
            for msg in Self::messages_to(&conn, forwarder_id)? {
                if !messages.contains(&msg) {
                    messages.push(msg);
                }
            }
        }
        Ok(messages)
    }

    /// Check whether the message is known to the history at all
    pub fn has_message(&self, msg_id: &str) -> Result<bool> {
        require_id("message id", msg_id)?;
        let conn = self.conn.lock().unwrap();
        Ok(Self::find_msg_row(&conn, msg_id)?.is_some())
    }

    /// Check whether the message was sent to the specific target
    pub fn has_target(&self, msg_id: &str, target_id: &str) -> Result<bool> {
        require_id("message id", msg_id)?;
        require_id("target id", target_id)?;
        let conn = self.conn.lock().unwrap();
        Self::relation_exists(&conn, msg_id, target_id)
    }

    /// Check whether the message was sent to ANY of the given targets
    ///
    /// OR semantics: one recorded target is enough. An empty list is plain
    /// false, but an empty id inside it is `InvalidArgument`.
    pub fn has_any_target(&self, msg_id: &str, target_ids: &[&str]) -> Result<bool> {
        require_id("message id", msg_id)?;
        for target_id in target_ids {
            require_id("target id", target_id)?;
        }
        let conn = self.conn.lock().unwrap();
        for target_id in target_ids {
            if Self::relation_exists(&conn, msg_id, target_id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// All message ids known to the history
    pub fn all_message_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT MsgId FROM MessageIDs")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Delete a message and all of its transmission facts
    ///
    /// Join rows go first; the message dimension row is only touched once
    /// they are gone. Target dimension rows are shared and stay.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty message id.
    /// - `NotFound` when the message is not recorded.
    pub fn delete_message(&self, msg_id: &str) -> Result<()> {
        require_id("message id", msg_id)?;
        let conn = self.conn.lock().unwrap();

        let msg_row = Self::find_msg_row(&conn, msg_id)?
            .ok_or_else(|| StoreError::NotFound(format!("message {}", msg_id)))?;

        conn.execute(
            "DELETE FROM MessageTargets WHERE MsgRowId = ?1",
            params![msg_row],
        )?;
        conn.execute("DELETE FROM MessageIDs WHERE MsgRowId = ?1", params![msg_row])?;

        tracing::debug!(msg_id, "deleted message from transmission history");
        Ok(())
    }

    /// Delete everything, in dependency order
    ///
    /// Joins, then targets, then messages; a failure aborts before the
    /// dependent deletes are attempted.
    pub fn reset(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM MessageTargets", [])?;
        conn.execute("DELETE FROM TargetIDs", [])?;
        conn.execute("DELETE FROM MessageIDs", [])?;
        tracing::debug!("transmission history reset");
        Ok(())
    }

    /// Number of known message ids
    pub fn message_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM MessageIDs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of known target ids
    pub fn target_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM TargetIDs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Look up a dimension row id by find SQL, creating via insert SQL if absent
    ///
    /// Insert-then-refetch: the re-find also covers a row created by an
    /// earlier, partially failed attempt on the same file.
    fn find_or_create_row(conn: &Connection, find: &str, insert: &str, id: &str) -> Result<i64> {
        let existing: Option<i64> = conn.query_row(find, params![id], |row| row.get(0)).optional()?;
        if let Some(row_id) = existing {
            return Ok(row_id);
        }

        conn.execute(insert, params![id])?;
        let created: Option<i64> = conn.query_row(find, params![id], |row| row.get(0)).optional()?;
        created.ok_or_else(|| StoreError::NotFound(format!("row for {} after insert", id)))
    }

    fn find_msg_row(conn: &Connection, msg_id: &str) -> Result<Option<i64>> {
        Ok(conn
            .query_row(
                "SELECT MsgRowId FROM MessageIDs WHERE MsgId = ?1",
                params![msg_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn relation_exists(conn: &Connection, msg_id: &str, target_id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1
                 FROM MessageTargets mt
                 JOIN MessageIDs m ON m.MsgRowId = mt.MsgRowId
                 JOIN TargetIDs t ON t.TargetRowID = mt.TargetRowID
                 WHERE m.MsgId = ?1 AND t.TargetID = ?2",
                params![msg_id, target_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn targets_of(conn: &Connection, msg_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT t.TargetID
             FROM MessageTargets mt
             JOIN MessageIDs m ON m.MsgRowId = mt.MsgRowId
             JOIN TargetIDs t ON t.TargetRowID = mt.TargetRowID
             WHERE m.MsgId = ?1",
        )?;
        let targets = stmt
            .query_map(params![msg_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(targets)
    }

    fn messages_to(conn: &Connection, target_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT m.MsgId
             FROM MessageTargets mt
             JOIN MessageIDs m ON m.MsgRowId = mt.MsgRowId
             JOIN TargetIDs t ON t.TargetRowID = mt.TargetRowID
             WHERE t.TargetID = ?1",
        )?;
        let messages = stmt
            .query_map(params![target_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(messages)
    }
}
