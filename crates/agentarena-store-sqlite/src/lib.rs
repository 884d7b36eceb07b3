// crates/agentarena-store-sqlite/src/lib.rs
// ============================================================================
// Crate: agentarena-store-sqlite
// Description: SQLite-backed implementation of agentarena_core::store::PersistentStore.
// Purpose: Durable storage for environments, agent accounts/aggregates and runs.
// ============================================================================

//! SQLite-backed implementation of `agentarena_core::store::PersistentStore`.

/// Configuration types for the SQLite store.
pub mod config;
/// SQLite store implementation.
pub mod store;

pub use config::JournalMode;
pub use config::SqliteStoreConfig;
pub use store::SqliteStore;
