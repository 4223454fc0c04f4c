// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the durable bookkeeping stores.
//!
//! Expected conditions (duplicate fact, missing row) are plain result
//! values, never panics; storage failures carry the underlying SQLite
//! error. None of the stores retry internally -- retry policy, if any,
//! belongs to the caller.

use thiserror::Error;

/// Bookkeeping store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Empty or malformed identifier, or an invalid sequence range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The fact or relation is already recorded where uniqueness is
    /// required.
    #[error("Already exists")]
    AlreadyExists,

    /// The referenced message, target, group or node is not recorded.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The storage engine reported a failure (bind, execute or row read).
    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    /// Allocation failure while building a result or creating a row.
    #[error("Resource exhausted")]
    ResourceExhausted,
}

/// Classify SQLite failures into the store taxonomy.
///
/// Uniqueness violations surface as `AlreadyExists` (the schemas carry
/// UNIQUE constraints on every fact and join table) and SQLITE_NOMEM as
/// `ResourceExhausted`; everything else stays a `Storage` error.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                rusqlite::ErrorCode::ConstraintViolation => StoreError::AlreadyExists,
                rusqlite::ErrorCode::OutOfMemory => StoreError::ResourceExhausted,
                _ => StoreError::Storage(err),
            },
            _ => StoreError::Storage(err),
        }
    }
}

impl From<driftsub::Error> for StoreError {
    fn from(err: driftsub::Error) -> Self {
        match err {
            driftsub::Error::InvalidRange(msg) => StoreError::InvalidArgument(msg),
            driftsub::Error::DuplicateRange => StoreError::AlreadyExists,
        }
    }
}

/// Convenience result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Reject empty identifiers before they reach the storage layer.
pub(crate) fn require_id(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidArgument(format!("empty {}", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_maps_to_already_exists() {
        let conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
        conn.execute("CREATE TABLE t (id TEXT UNIQUE)", [])
            .expect("create table");
        conn.execute("INSERT INTO t (id) VALUES ('x')", [])
            .expect("first insert");

        let err = conn
            .execute("INSERT INTO t (id) VALUES ('x')", [])
            .expect_err("duplicate insert must fail");
        assert!(matches!(StoreError::from(err), StoreError::AlreadyExists));
    }

    #[test]
    fn test_core_error_conversion() {
        let err: StoreError = driftsub::Error::DuplicateRange.into();
        assert!(matches!(err, StoreError::AlreadyExists));

        let err: StoreError = driftsub::Error::InvalidRange("bad".into()).into();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn test_require_id() {
        assert!(require_id("group", "G").is_ok());
        assert!(matches!(
            require_id("group", ""),
            Err(StoreError::InvalidArgument(_))
        ));
    }
}
