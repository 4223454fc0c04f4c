// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Store configuration.

use std::path::PathBuf;

/// Bookkeeping store configuration
///
/// Shared by [`ReceivedSequenceIndex`](crate::ReceivedSequenceIndex) and
/// [`TransmissionHistory`](crate::TransmissionHistory); each store opens its
/// own connection from it (handles are never shared between components).
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file path; None selects a private in-memory database.
    pub db_path: Option<PathBuf>,

    /// SQLite busy timeout in milliseconds (another process may hold the
    /// file; 0 disables waiting).
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    db_path: Option<PathBuf>,
    busy_timeout_ms: Option<u64>,
}

impl ConfigBuilder {
    /// Set the database file path (unset = in-memory)
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Set the SQLite busy timeout in milliseconds
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        let defaults = Config::default();

        Config {
            db_path: self.db_path,
            busy_timeout_ms: self.busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .db_path("/tmp/bookkeeping.db")
            .busy_timeout_ms(250)
            .build();

        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/tmp/bookkeeping.db"))
        );
        assert_eq!(config.busy_timeout_ms, 250);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.db_path.is_none());
        assert_eq!(config.busy_timeout_ms, 5000);
    }
}
