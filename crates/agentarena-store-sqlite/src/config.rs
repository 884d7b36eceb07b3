// crates/agentarena-store-sqlite/src/config.rs
// ============================================================================
// Module: SQLite Store Configuration
// Description: Pragma and path settings for the SQLite-backed persistent store.
// Purpose: Keep connection tuning declarative and serializable for the
//          single-connection design this crate uses.
// Dependencies: serde
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// WAL journal mode (recommended for concurrent readers).
    #[default]
    Wal,
    /// Delete journal mode (legacy, simpler recovery semantics).
    Delete,
}

impl JournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for the `SQLite`-backed persistent store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds, applied so concurrent request handlers
    /// block rather than fail immediately on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: JournalMode,
}

/// Serde default for [`SqliteStoreConfig::busy_timeout_ms`].
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl SqliteStoreConfig {
    /// Builds a config pointing at `path` with default pragma settings.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, busy_timeout_ms: default_busy_timeout_ms(), journal_mode: JournalMode::default() }
    }
}
