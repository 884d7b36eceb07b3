// crates/agentarena-core/src/store.rs
// ============================================================================
// Module: Persistent Store Interface
// Description: Session/transaction seam implemented by agentarena-store-sqlite.
// Purpose: Let the dispatcher depend on storage semantics, not on SQLite.
// Dependencies: none (pure trait + error definitions)
// ============================================================================

//! ## Overview
//! A [`PersistentStore`] exposes snapshot-isolated, read-modify-write
//! sessions: within one session all reads observe a consistent view, and a
//! single commit atomically publishes every write made through it. This
//! mirrors the per-action transaction discipline the dispatcher relies on
//! (`agentarena-engine` opens one session per submitted action and per
//! outgoing run creation).

use crate::identifiers::AgentId;
use crate::identifiers::EnvSlug;
use crate::identifiers::RunId;
use crate::model::AgentAccount;
use crate::model::AgentAggregate;
use crate::model::EnvironmentRecord;
use crate::model::RunRecord;

/// Errors a store implementation may surface.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying storage engine reported a failure.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// A write attempted to violate a primary-key uniqueness invariant.
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    /// A read referenced a record that does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// The stored payload could not be deserialized into the expected shape.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// A snapshot-isolated read-modify-write session.
///
/// # Invariants
/// - All reads made through one session observe a consistent snapshot.
/// - Writes are invisible to other sessions until [`StoreSession::commit`]
///   returns successfully; dropping a session without committing discards
///   its writes.
pub trait StoreSession {
    /// Loads an environment record by slug.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no such environment exists, or a
    /// backend/corruption error.
    fn load_environment(&mut self, slug: &EnvSlug) -> Result<EnvironmentRecord, StoreError>;

    /// Persists an environment record, overwriting any existing one with the
    /// same slug.
    ///
    /// # Errors
    /// Returns a backend error if the write cannot be staged.
    fn save_environment(&mut self, record: &EnvironmentRecord) -> Result<(), StoreError>;

    /// Deletes an environment and cascades to its accounts, aggregates and
    /// runs.
    ///
    /// # Errors
    /// Returns a backend error if the cascade cannot be staged.
    fn delete_environment(&mut self, slug: &EnvSlug) -> Result<(), StoreError>;

    /// Loads an agent account.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no such account exists.
    fn load_account(&mut self, id: &AgentId) -> Result<AgentAccount, StoreError>;

    /// Persists an agent account, overwriting any existing one with the same
    /// id.
    ///
    /// # Errors
    /// Returns a backend error if the write cannot be staged.
    fn save_account(&mut self, account: &AgentAccount) -> Result<(), StoreError>;

    /// Loads an agent's rating aggregate, if one has been created.
    ///
    /// # Errors
    /// Returns a backend/corruption error; a missing aggregate is `Ok(None)`,
    /// not an error (aggregates are created lazily on first finished run).
    fn load_aggregate(&mut self, id: &AgentId) -> Result<Option<AgentAggregate>, StoreError>;

    /// Persists an agent's rating aggregate.
    ///
    /// # Errors
    /// Returns a backend error if the write cannot be staged.
    fn save_aggregate(&mut self, aggregate: &AgentAggregate) -> Result<(), StoreError>;

    /// Loads a run by id.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no such run exists.
    fn load_run(&mut self, id: RunId) -> Result<RunRecord, StoreError>;

    /// Persists a run, overwriting any existing one with the same id.
    ///
    /// # Errors
    /// Returns a backend error if the write cannot be staged.
    fn save_run(&mut self, run: &RunRecord) -> Result<(), StoreError>;

    /// Allocates a fresh run id and inserts a new run record.
    ///
    /// # Errors
    /// Returns a backend error if the write cannot be staged.
    fn create_run(&mut self, run: RunRecord) -> Result<RunId, StoreError>;

    /// Lists every unfinished run owned by `agent`, ascending by run id.
    ///
    /// # Errors
    /// Returns a backend error if the query cannot be staged.
    fn list_unfinished_runs(&mut self, agent: &AgentId) -> Result<Vec<RunRecord>, StoreError>;

    /// Lists every agent account id registered under `env`, ascending by
    /// agent name. Backs the admin results listing (`GET /results[/<env>]`),
    /// which the original iterates via `get_all_agentaccounts_for_env`.
    ///
    /// # Errors
    /// Returns a backend error if the query cannot be staged.
    fn list_agent_ids(&mut self, env: &EnvSlug) -> Result<Vec<AgentId>, StoreError>;

    /// Lists every registered environment slug, ascending.
    ///
    /// # Errors
    /// Returns a backend error if the query cannot be staged.
    fn list_environment_slugs(&mut self) -> Result<Vec<EnvSlug>, StoreError>;

    /// Deletes finished runs belonging to `agent` whose id is not in `keep`.
    /// Returns the number of runs deleted.
    ///
    /// # Errors
    /// Returns a backend error if the deletion cannot be staged.
    fn delete_nonrecent_runs(&mut self, agent: &AgentId, keep: &[RunId]) -> Result<u64, StoreError>;

    /// Generic key/value `get`.
    ///
    /// # Errors
    /// Returns a backend error if the read fails.
    fn kv_get(&mut self, key: &str) -> Result<Option<String>, StoreError>;

    /// Generic key/value `set`.
    ///
    /// # Errors
    /// Returns a backend error if the write cannot be staged.
    fn kv_set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Atomically publishes every write made through this session.
    ///
    /// # Errors
    /// Returns a backend error if the commit fails; no writes are visible to
    /// other sessions in that case.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Durable storage for accounts, agent aggregates, runs and environments.
pub trait PersistentStore: Send + Sync {
    /// Opens a fresh read-modify-write session.
    ///
    /// # Errors
    /// Returns a backend error if a session cannot be opened.
    fn begin(&self) -> Result<Box<dyn StoreSession + '_>, StoreError>;

    /// Reclaims disk space freed by prior deletions.
    ///
    /// # Errors
    /// Returns a backend error if reclamation fails.
    fn vacuum(&self) -> Result<(), StoreError>;
}
