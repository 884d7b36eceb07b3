// crates/agentarena-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Persistent Store
// Description: agentarena_core::store::PersistentStore backed by SQLite.
// Purpose: Durable accounts/agents/runs/environments storage with per-session
//          snapshot isolation via a single mutex-guarded connection.
// Dependencies: agentarena-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! [`SqliteStore`] wraps a single [`rusqlite::Connection`] in a
//! [`std::sync::Mutex`] and runs every session as a plain `BEGIN IMMEDIATE`
//! / `COMMIT` / `ROLLBACK` block on the held guard. `SQLite`'s own locking
//! provides the snapshot isolation [`agentarena_core::store::PersistentStore`]
//! requires; no in-process writer queue is needed at this engine's
//! per-action transaction granularity.

use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;

use agentarena_core::identifiers::AgentId;
use agentarena_core::identifiers::AgentName;
use agentarena_core::identifiers::EnvSlug;
use agentarena_core::identifiers::RunId;
use agentarena_core::model::ActionHistoryEntry;
use agentarena_core::model::AgentAccount;
use agentarena_core::model::AgentAggregate;
use agentarena_core::model::AgentStatus;
use agentarena_core::model::EnvironmentRecord;
use agentarena_core::model::EnvironmentStatus;
use agentarena_core::model::RunRecord;
use agentarena_core::model::SignupPolicy;
use agentarena_core::store::PersistentStore;
use agentarena_core::store::StoreError;
use agentarena_core::store::StoreSession;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::config::SqliteStoreConfig;

/// Current on-disk schema version recorded in `store_meta`.
const SCHEMA_VERSION: i64 = 1;

/// DDL applied on every open; each statement is idempotent.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);
CREATE TABLE IF NOT EXISTS environments (
    slug TEXT PRIMARY KEY,
    env_class TEXT NOT NULL,
    display_name TEXT NOT NULL,
    display_group TEXT,
    config TEXT NOT NULL,
    signup TEXT NOT NULL,
    status TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS agent_accounts (
    id TEXT PRIMARY KEY,
    env TEXT NOT NULL,
    name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    status TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS agent_aggregates (
    id TEXT PRIMARY KEY,
    env TEXT NOT NULL,
    name TEXT NOT NULL,
    total_runs INTEGER NOT NULL,
    fully_evaluated INTEGER NOT NULL,
    recent_results TEXT NOT NULL,
    recently_finished_runs TEXT NOT NULL,
    current_rating REAL NOT NULL,
    best_rating REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    env TEXT NOT NULL,
    agent_id TEXT NOT NULL,
    finished INTEGER NOT NULL,
    outstanding_action INTEGER NOT NULL,
    state TEXT NOT NULL,
    history TEXT NOT NULL,
    outcome REAL
);
CREATE INDEX IF NOT EXISTS runs_agent_idx ON runs(agent_id, finished);
CREATE TABLE IF NOT EXISTS keyval (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Wraps an `rusqlite` error as a backend [`StoreError`].
fn map_sqlite(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Opens the database at `config.path`, applies pragmas, and migrates the
/// schema.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, StoreError> {
    let connection = Connection::open(&config.path).map_err(map_sqlite)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(map_sqlite)?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms)).map_err(map_sqlite)?;
    connection.execute_batch(SCHEMA_SQL).map_err(map_sqlite)?;
    let version: Option<i64> =
        connection.query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0)).optional().map_err(map_sqlite)?;
    if version.is_none() {
        connection.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION]).map_err(map_sqlite)?;
    }
    Ok(connection)
}

/// `SQLite`-backed [`PersistentStore`].
pub struct SqliteStore {
    /// Single shared connection, serialized behind a mutex.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if absent) the database at `config.path` and applies
    /// the schema migration.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, StoreError> {
        Ok(Self { conn: Mutex::new(open_connection(&config)?) })
    }

    /// Opens an in-memory database, for tests.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the in-memory schema cannot be
    /// created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(SqliteStoreConfig::new(Path::new(":memory:").to_path_buf()))
    }
}

impl PersistentStore for SqliteStore {
    fn begin(&self) -> Result<Box<dyn StoreSession + '_>, StoreError> {
        let guard = self.conn.lock().map_err(|_| StoreError::Backend("store mutex poisoned".to_owned()))?;
        guard.execute_batch("BEGIN IMMEDIATE;").map_err(map_sqlite)?;
        Ok(Box::new(SqliteSession { guard, committed: false }))
    }

    fn vacuum(&self) -> Result<(), StoreError> {
        let guard = self.conn.lock().map_err(|_| StoreError::Backend("store mutex poisoned".to_owned()))?;
        guard.execute_batch("VACUUM;").map_err(map_sqlite)
    }
}

struct SqliteSession<'a> {
    /// Held mutex guard for the lifetime of the transaction.
    guard: MutexGuard<'a, Connection>,
    /// Set once `commit` has run, so `Drop` knows not to roll back.
    committed: bool,
}

impl Drop for SqliteSession<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.guard.execute_batch("ROLLBACK;");
        }
    }
}

/// Extracts a run's raw column tuple from a query row, ahead of
/// [`materialize_run`] deserializing its `state`/`history` JSON.
fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, bool, bool, String, String, Option<f64>)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get::<_, i64>(3)? != 0,
        row.get::<_, i64>(4)? != 0,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

/// Builds a [`RunRecord`] from a row's raw columns, parsing the stored
/// `agent_id`, `state` and `history` back into typed values.
fn materialize_run(
    id: i64,
    env: String,
    agent_id: String,
    finished: bool,
    outstanding_action: bool,
    state: String,
    history: String,
    outcome: Option<f64>,
) -> Result<RunRecord, StoreError> {
    let env = EnvSlug::parse(env).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let (_env_part, name_part) =
        agent_id.split_once('/').ok_or_else(|| StoreError::Corrupt(format!("malformed agent id: {agent_id}")))?;
    let name = AgentName::parse(name_part.to_owned()).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let agent = AgentId::new(env.clone(), name);
    let state = serde_json::from_str(&state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let history: Vec<ActionHistoryEntry> = serde_json::from_str(&history).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok(RunRecord { id: RunId::new(id), env, agent, finished, outstanding_action, state, history, outcome })
}

impl StoreSession for SqliteSession<'_> {
    fn load_environment(&mut self, slug: &EnvSlug) -> Result<EnvironmentRecord, StoreError> {
        let row = self
            .guard
            .query_row(
                "SELECT slug, env_class, display_name, display_group, config, signup, status FROM environments WHERE slug = ?1",
                params![slug.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(map_sqlite)?
            .ok_or_else(|| StoreError::NotFound(format!("environment {}", slug.as_str())))?;
        let (slug, env_class, display_name, display_group, config, signup, status) = row;
        Ok(EnvironmentRecord {
            slug: EnvSlug::parse(slug).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            env_class,
            display_name,
            display_group,
            config: serde_json::from_str(&config).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            signup: if signup == "restricted" { SignupPolicy::Restricted } else { return Err(StoreError::Corrupt(signup)) },
            status: if status == "active" { EnvironmentStatus::Active } else { return Err(StoreError::Corrupt(status)) },
        })
    }

    fn save_environment(&mut self, record: &EnvironmentRecord) -> Result<(), StoreError> {
        let config = serde_json::to_string(&record.config).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.guard
            .execute(
                "INSERT INTO environments (slug, env_class, display_name, display_group, config, signup, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'restricted', 'active')
                 ON CONFLICT(slug) DO UPDATE SET env_class = excluded.env_class, display_name = excluded.display_name,
                     display_group = excluded.display_group, config = excluded.config",
                params![record.slug.as_str(), record.env_class, record.display_name, record.display_group, config],
            )
            .map_err(map_sqlite)?;
        Ok(())
    }

    fn delete_environment(&mut self, slug: &EnvSlug) -> Result<(), StoreError> {
        let prefix = format!("{}/%", slug.as_str());
        self.guard.execute("DELETE FROM runs WHERE env = ?1", params![slug.as_str()]).map_err(map_sqlite)?;
        self.guard.execute("DELETE FROM agent_aggregates WHERE env = ?1", params![slug.as_str()]).map_err(map_sqlite)?;
        self.guard.execute("DELETE FROM agent_accounts WHERE env = ?1", params![slug.as_str()]).map_err(map_sqlite)?;
        self.guard.execute("DELETE FROM keyval WHERE key LIKE ?1", params![prefix]).map_err(map_sqlite)?;
        self.guard.execute("DELETE FROM environments WHERE slug = ?1", params![slug.as_str()]).map_err(map_sqlite)?;
        Ok(())
    }

    fn load_account(&mut self, id: &AgentId) -> Result<AgentAccount, StoreError> {
        let key = id.storage_key();
        let (password_hash, status): (String, String) = self
            .guard
            .query_row("SELECT password_hash, status FROM agent_accounts WHERE id = ?1", params![key], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()
            .map_err(map_sqlite)?
            .ok_or_else(|| StoreError::NotFound(format!("agent account {key}")))?;
        let status = if status == "active" { AgentStatus::Active } else { AgentStatus::Locked };
        Ok(AgentAccount { id: id.clone(), password_hash, status })
    }

    fn save_account(&mut self, account: &AgentAccount) -> Result<(), StoreError> {
        let key = account.id.storage_key();
        let status = match account.status {
            AgentStatus::Active => "active",
            AgentStatus::Locked => "locked",
        };
        self.guard
            .execute(
                "INSERT INTO agent_accounts (id, env, name, password_hash, status) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET password_hash = excluded.password_hash, status = excluded.status",
                params![key, account.id.env().as_str(), account.id.name().as_str(), account.password_hash, status],
            )
            .map_err(map_sqlite)?;
        Ok(())
    }

    fn load_aggregate(&mut self, id: &AgentId) -> Result<Option<AgentAggregate>, StoreError> {
        let key = id.storage_key();
        let row = self
            .guard
            .query_row(
                "SELECT total_runs, fully_evaluated, recent_results, recently_finished_runs, current_rating, best_rating
                 FROM agent_aggregates WHERE id = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)? != 0,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(map_sqlite)?;
        let Some((total_runs, fully_evaluated, recent_results, recently_finished_runs, current_rating, best_rating)) = row else {
            return Ok(None);
        };
        let recent_results: Vec<f64> = serde_json::from_str(&recent_results).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let recently_finished_runs: Vec<i64> =
            serde_json::from_str(&recently_finished_runs).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Some(AgentAggregate {
            id: id.clone(),
            total_runs: u64::try_from(total_runs).unwrap_or_default(),
            fully_evaluated,
            recent_results,
            recently_finished_runs: recently_finished_runs.into_iter().map(RunId::new).collect(),
            current_rating,
            best_rating,
        }))
    }

    fn save_aggregate(&mut self, aggregate: &AgentAggregate) -> Result<(), StoreError> {
        let key = aggregate.id.storage_key();
        let recent_results = serde_json::to_string(&aggregate.recent_results).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let recently_finished_runs: Vec<i64> = aggregate.recently_finished_runs.iter().map(|r| r.get()).collect();
        let recently_finished_runs =
            serde_json::to_string(&recently_finished_runs).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.guard
            .execute(
                "INSERT INTO agent_aggregates (id, env, name, total_runs, fully_evaluated, recent_results,
                     recently_finished_runs, current_rating, best_rating)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET total_runs = excluded.total_runs, fully_evaluated = excluded.fully_evaluated,
                     recent_results = excluded.recent_results, recently_finished_runs = excluded.recently_finished_runs,
                     current_rating = excluded.current_rating, best_rating = excluded.best_rating",
                params![
                    key,
                    aggregate.id.env().as_str(),
                    aggregate.id.name().as_str(),
                    i64::try_from(aggregate.total_runs).unwrap_or(i64::MAX),
                    i64::from(aggregate.fully_evaluated),
                    recent_results,
                    recently_finished_runs,
                    aggregate.current_rating,
                    aggregate.best_rating,
                ],
            )
            .map_err(map_sqlite)?;
        Ok(())
    }

    fn load_run(&mut self, id: RunId) -> Result<RunRecord, StoreError> {
        let row = self
            .guard
            .query_row(
                "SELECT id, env, agent_id, finished, outstanding_action, state, history, outcome FROM runs WHERE id = ?1",
                params![id.get()],
                run_from_row,
            )
            .optional()
            .map_err(map_sqlite)?
            .ok_or_else(|| StoreError::NotFound(format!("run {id}")))?;
        materialize_run(row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7)
    }

    fn save_run(&mut self, run: &RunRecord) -> Result<(), StoreError> {
        let state = serde_json::to_string(&run.state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let history = serde_json::to_string(&run.history).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.guard
            .execute(
                "UPDATE runs SET finished = ?2, outstanding_action = ?3, state = ?4, history = ?5, outcome = ?6 WHERE id = ?1",
                params![run.id.get(), i64::from(run.finished), i64::from(run.outstanding_action), state, history, run.outcome],
            )
            .map_err(map_sqlite)?;
        Ok(())
    }

    fn create_run(&mut self, run: RunRecord) -> Result<RunId, StoreError> {
        let state = serde_json::to_string(&run.state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let history = serde_json::to_string(&run.history).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.guard
            .execute(
                "INSERT INTO runs (env, agent_id, finished, outstanding_action, state, history, outcome)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run.env.as_str(),
                    run.agent.storage_key(),
                    i64::from(run.finished),
                    i64::from(run.outstanding_action),
                    state,
                    history,
                    run.outcome,
                ],
            )
            .map_err(map_sqlite)?;
        Ok(RunId::new(self.guard.last_insert_rowid()))
    }

    fn list_unfinished_runs(&mut self, agent: &AgentId) -> Result<Vec<RunRecord>, StoreError> {
        let key = agent.storage_key();
        let mut stmt = self
            .guard
            .prepare(
                "SELECT id, env, agent_id, finished, outstanding_action, state, history, outcome
                 FROM runs WHERE agent_id = ?1 AND finished = 0 ORDER BY id ASC",
            )
            .map_err(map_sqlite)?;
        let rows = stmt.query_map(params![key], run_from_row).map_err(map_sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            let row = row.map_err(map_sqlite)?;
            out.push(materialize_run(row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7)?);
        }
        Ok(out)
    }

    fn list_agent_ids(&mut self, env: &EnvSlug) -> Result<Vec<AgentId>, StoreError> {
        let mut stmt = self
            .guard
            .prepare("SELECT name FROM agent_accounts WHERE env = ?1 ORDER BY name ASC")
            .map_err(map_sqlite)?;
        let rows = stmt.query_map(params![env.as_str()], |row| row.get::<_, String>(0)).map_err(map_sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            let name = row.map_err(map_sqlite)?;
            let name = AgentName::parse(name).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            out.push(AgentId::new(env.clone(), name));
        }
        Ok(out)
    }

    fn list_environment_slugs(&mut self) -> Result<Vec<EnvSlug>, StoreError> {
        let mut stmt = self.guard.prepare("SELECT slug FROM environments ORDER BY slug ASC").map_err(map_sqlite)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).map_err(map_sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            let slug = row.map_err(map_sqlite)?;
            out.push(EnvSlug::parse(slug).map_err(|e| StoreError::Corrupt(e.to_string()))?);
        }
        Ok(out)
    }

    fn delete_nonrecent_runs(&mut self, agent: &AgentId, keep: &[RunId]) -> Result<u64, StoreError> {
        let key = agent.storage_key();
        let ids: Vec<i64> = {
            let mut stmt = self.guard.prepare("SELECT id FROM runs WHERE agent_id = ?1 AND finished = 1").map_err(map_sqlite)?;
            stmt.query_map(params![key], |row| row.get::<_, i64>(0))
                .map_err(map_sqlite)?
                .collect::<Result<_, _>>()
                .map_err(map_sqlite)?
        };
        let keep: std::collections::HashSet<i64> = keep.iter().map(|r| r.get()).collect();
        let mut deleted = 0u64;
        for id in ids {
            if !keep.contains(&id) {
                self.guard.execute("DELETE FROM runs WHERE id = ?1", params![id]).map_err(map_sqlite)?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn kv_get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.guard
            .query_row("SELECT value FROM keyval WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(map_sqlite)
    }

    fn kv_set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.guard
            .execute(
                "INSERT INTO keyval (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(map_sqlite)?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.guard.execute_batch("COMMIT;").map_err(map_sqlite)?;
        self.committed = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(slug: &str) -> EnvironmentRecord {
        EnvironmentRecord {
            slug: EnvSlug::parse(slug).unwrap(),
            env_class: "nim".to_owned(),
            display_name: "Nim".to_owned(),
            display_group: None,
            config: json!({}),
            signup: SignupPolicy::Restricted,
            status: EnvironmentStatus::Active,
        }
    }

    #[test]
    fn environment_round_trips_through_a_committed_session() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut session = store.begin().unwrap();
        session.save_environment(&env("nim")).unwrap();
        session.commit().unwrap();

        let mut session = store.begin().unwrap();
        let loaded = session.load_environment(&EnvSlug::parse("nim").unwrap()).unwrap();
        assert_eq!(loaded.env_class, "nim");
    }

    #[test]
    fn dropped_session_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let mut session = store.begin().unwrap();
            session.save_environment(&env("nim")).unwrap();
        }
        let mut session = store.begin().unwrap();
        assert!(session.load_environment(&EnvSlug::parse("nim").unwrap()).is_err());
    }

    #[test]
    fn run_lifecycle_persists() {
        let store = SqliteStore::open_in_memory().unwrap();
        let agent = AgentId::new(EnvSlug::parse("nim").unwrap(), AgentName::parse("a").unwrap());
        let run_id;
        {
            let mut session = store.begin().unwrap();
            let run = RunRecord {
                id: RunId::new(1),
                env: EnvSlug::parse("nim").unwrap(),
                agent: agent.clone(),
                finished: false,
                outstanding_action: true,
                state: json!(10),
                history: Vec::new(),
                outcome: None,
            };
            run_id = session.create_run(run).unwrap();
            session.commit().unwrap();
        }
        let mut session = store.begin().unwrap();
        let loaded = session.load_run(run_id).unwrap();
        assert_eq!(loaded.state, json!(10));
        assert!(loaded.outstanding_action);
        let unfinished = session.list_unfinished_runs(&agent).unwrap();
        assert_eq!(unfinished.len(), 1);
    }
}
