// crates/agentarena-engine/src/admin.rs
// ============================================================================
// Module: Administrative Operations
// Description: Non-HTTP business logic behind the admin endpoints.
// Purpose: Give a CLI or an embedding HTTP layer direct, testable entry
//          points for account/environment management and housekeeping.
// Dependencies: agentarena-core, rand, base64
// ============================================================================

//! ## Overview
//! Account creation mints a high-entropy password server-side (the client
//! never chooses one), environment creation registers a record, and
//! `remove_nonrecent_runs` sweeps every agent in an environment before
//! reclaiming space with a single `VACUUM`.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use agentarena_core::identifiers::AgentId;
use agentarena_core::identifiers::AgentName;
use agentarena_core::identifiers::EnvSlug;
use agentarena_core::model::AgentAccount;
use agentarena_core::model::AgentStatus;
use agentarena_core::model::EnvironmentRecord;
use agentarena_core::model::EnvironmentStatus;
use agentarena_core::model::SignupPolicy;
use agentarena_core::store::PersistentStore;
use agentarena_core::store::StoreError;
use serde_json::Value;

use crate::auth::hash_password;
use crate::error::EngineError;
use crate::telemetry::EngineMetrics;

/// Number of random bytes used to mint an agent password, giving well over
/// 256 bits of entropy once base64url-encoded.
const GENERATED_PASSWORD_BYTES: usize = 32;

/// Generates a high-entropy, URL-safe password analogous to
/// `secrets.token_urlsafe(32)`.
fn generate_password() -> String {
    let mut bytes = [0u8; GENERATED_PASSWORD_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Result of creating an agent account: the credential a client authenticates
/// with from then on.
#[derive(Debug, Clone)]
pub struct CreatedAgent {
    /// The agent's identifier.
    pub id: AgentId,
    /// The generated plaintext password; shown to the admin exactly once.
    pub password: String,
}

/// Creates a new agent account under `env`, generating its password.
///
/// If `overwrite` is `false` and an account already exists under `id`, the
/// existing account (and its password) is left untouched and an error is
/// returned rather than silently reissuing a credential.
///
/// # Errors
/// Returns [`EngineError::UnknownEnvironment`] if `env` is not registered,
/// or [`EngineError::Validation`] if the account exists and `overwrite` is
/// `false`.
pub fn create_agent(
    store: &dyn PersistentStore,
    env: &EnvSlug,
    name: &AgentName,
    overwrite: bool,
) -> Result<CreatedAgent, EngineError> {
    let mut session = store.begin()?;
    session.load_environment(env).map_err(|e| match e {
        StoreError::NotFound(_) => EngineError::UnknownEnvironment(env.to_string()),
        other => EngineError::Store(other),
    })?;

    let id = AgentId::new(env.clone(), name.clone());
    if !overwrite && session.load_account(&id).is_ok() {
        return Err(EngineError::Validation(format!("agent account {id} already exists")));
    }

    let password = generate_password();
    let account = AgentAccount { id: id.clone(), password_hash: hash_password(&password), status: AgentStatus::Active };
    session.save_account(&account)?;
    session.commit()?;

    Ok(CreatedAgent { id, password })
}

/// Sets an agent account's lock status (`/blockagent`, `/unblockagent`).
///
/// # Errors
/// Returns [`EngineError::UnknownAgent`] if no such account exists.
pub fn set_agent_status(store: &dyn PersistentStore, id: &AgentId, status: AgentStatus) -> Result<(), EngineError> {
    let mut session = store.begin()?;
    let mut account = session.load_account(id).map_err(|e| match e {
        StoreError::NotFound(_) => EngineError::UnknownAgent(id.to_string()),
        other => EngineError::Store(other),
    })?;
    account.status = status;
    session.save_account(&account)?;
    session.commit()?;
    Ok(())
}

/// Registers a new environment record (`PUT /makeenv/<env>`).
///
/// # Errors
/// Returns [`EngineError::Validation`] if the slug is already registered and
/// `overwrite` is `false`.
pub fn create_environment(
    store: &dyn PersistentStore,
    slug: &EnvSlug,
    env_class: String,
    display_name: String,
    config: Value,
    overwrite: bool,
) -> Result<(), EngineError> {
    let mut session = store.begin()?;
    if !overwrite && session.load_environment(slug).is_ok() {
        return Err(EngineError::Validation(format!("environment {slug} already exists")));
    }
    let record = EnvironmentRecord {
        slug: slug.clone(),
        env_class,
        display_name,
        display_group: None,
        config,
        signup: SignupPolicy::Restricted,
        status: EnvironmentStatus::Active,
    };
    session.save_environment(&record)?;
    session.commit()?;
    Ok(())
}

/// Deletes an environment and cascades to every account, aggregate and run
/// scoped to it (`DELETE /makeenv/<env>`).
///
/// # Errors
/// Returns [`EngineError::UnknownEnvironment`] if `env` is not registered.
pub fn delete_environment(store: &dyn PersistentStore, env: &EnvSlug) -> Result<(), EngineError> {
    let mut session = store.begin()?;
    session.load_environment(env).map_err(|e| match e {
        StoreError::NotFound(_) => EngineError::UnknownEnvironment(env.to_string()),
        other => EngineError::Store(other),
    })?;
    session.delete_environment(env)?;
    session.commit()?;
    Ok(())
}

/// A single agent's rating snapshot, as returned by `GET /results[/<env>]`.
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// The agent's bare display name.
    pub agent: String,
    /// Current rating.
    pub rating: f64,
    /// Whether the agent has completed enough runs to count.
    pub fully_evaluated: bool,
    /// Number of finished runs.
    pub total_runs: u64,
}

/// Returns a rating snapshot for every agent registered under `env`.
///
/// An agent with no aggregate yet (no finished runs) is reported with its
/// environment's `INITIAL_RATING` and zero runs, matching
/// `AgentData.to_agent_data_summary`'s defaults for a fresh account.
///
/// # Errors
/// Returns [`EngineError::UnknownEnvironment`] if `env` is not registered.
pub fn results_for_env(store: &dyn PersistentStore, env: &EnvSlug, initial_rating: f64) -> Result<Vec<AgentResult>, EngineError> {
    let mut session = store.begin()?;
    session.load_environment(env).map_err(|e| match e {
        StoreError::NotFound(_) => EngineError::UnknownEnvironment(env.to_string()),
        other => EngineError::Store(other),
    })?;
    let agent_ids = session.list_agent_ids(env)?;
    let mut results = Vec::with_capacity(agent_ids.len());
    for id in agent_ids {
        let aggregate = session.load_aggregate(&id)?;
        results.push(match aggregate {
            Some(a) => AgentResult {
                agent: id.name().as_str().to_owned(),
                rating: a.current_rating,
                fully_evaluated: a.fully_evaluated,
                total_runs: a.total_runs,
            },
            None => {
                AgentResult { agent: id.name().as_str().to_owned(), rating: initial_rating, fully_evaluated: false, total_runs: 0 }
            }
        });
    }
    session.commit()?;
    Ok(results)
}

/// Returns a rating snapshot for every agent in every registered environment.
///
/// # Errors
/// Propagates any backend error from the per-environment listing.
pub fn results(store: &dyn PersistentStore, initial_rating: f64) -> Result<Vec<(EnvSlug, Vec<AgentResult>)>, EngineError> {
    let envs = {
        let mut session = store.begin()?;
        let envs = session.list_environment_slugs()?;
        session.commit()?;
        envs
    };
    envs.into_iter().map(|env| Ok((env.clone(), results_for_env(store, &env, initial_rating)?))).collect()
}

/// Deletes finished runs outside every agent's retained recent-runs window
/// across every agent in `env`, then reclaims freed space.
///
/// # Errors
/// Returns [`EngineError::UnknownEnvironment`] if `env` is not registered.
pub fn remove_nonrecent_runs(store: &dyn PersistentStore, env: &EnvSlug, metrics: &dyn EngineMetrics) -> Result<u64, EngineError> {
    let started = std::time::Instant::now();
    let mut total_deleted = 0u64;
    let agent_ids = {
        let mut session = store.begin()?;
        session.load_environment(env).map_err(|e| match e {
            StoreError::NotFound(_) => EngineError::UnknownEnvironment(env.to_string()),
            other => EngineError::Store(other),
        })?;
        let ids = session.list_agent_ids(env)?;
        session.commit()?;
        ids
    };
    for id in agent_ids {
        let mut session = store.begin()?;
        let keep = session.load_aggregate(&id)?.map(|a| a.recently_finished_runs).unwrap_or_default();
        total_deleted += session.delete_nonrecent_runs(&id, &keep)?;
        session.commit()?;
    }
    store.vacuum()?;
    metrics.record_cleanup(env.as_str(), usize::try_from(total_deleted).unwrap_or(usize::MAX), started.elapsed());
    Ok(total_deleted)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]
mod tests {
    use super::*;
    use crate::telemetry::NoopMetrics;
    use agentarena_store_sqlite::SqliteStore;
    use serde_json::json;

    fn env_slug() -> EnvSlug {
        EnvSlug::parse("nim").unwrap()
    }

    fn agent_name() -> AgentName {
        AgentName::parse("a").unwrap()
    }

    fn setup() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        create_environment(&store, &env_slug(), "nim".to_owned(), "Nim".to_owned(), json!({}), false).unwrap();
        store
    }

    #[test]
    fn create_agent_generates_distinct_passwords() {
        let store = setup();
        let a = create_agent(&store, &env_slug(), &agent_name(), false).unwrap();
        let err = create_agent(&store, &env_slug(), &agent_name(), false).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(!a.password.is_empty());
    }

    #[test]
    fn set_agent_status_round_trips() {
        let store = setup();
        let created = create_agent(&store, &env_slug(), &agent_name(), false).unwrap();
        set_agent_status(&store, &created.id, AgentStatus::Locked).unwrap();
        let mut session = store.begin().unwrap();
        assert_eq!(session.load_account(&created.id).unwrap().status, AgentStatus::Locked);
    }

    #[test]
    fn results_reports_seeded_defaults_for_fresh_agent() {
        let store = setup();
        create_agent(&store, &env_slug(), &agent_name(), false).unwrap();
        let results = results_for_env(&store, &env_slug(), 0.0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].total_runs, 0);
        assert!(!results[0].fully_evaluated);
    }

    #[test]
    fn remove_nonrecent_runs_reports_zero_when_nothing_to_clean() {
        let store = setup();
        create_agent(&store, &env_slug(), &agent_name(), false).unwrap();
        let deleted = remove_nonrecent_runs(&store, &env_slug(), &NoopMetrics).unwrap();
        assert_eq!(deleted, 0);
    }

    #[test]
    fn delete_environment_cascades_to_accounts_aggregates_and_runs() {
        use agentarena_core::identifiers::RunId;
        use agentarena_core::model::AgentAggregate;
        use agentarena_core::model::RunRecord;

        let store = setup();
        let created = create_agent(&store, &env_slug(), &agent_name(), false).unwrap();

        let run_id = {
            let mut session = store.begin().unwrap();
            let run_id = session
                .create_run(RunRecord {
                    id: RunId::new(1),
                    env: env_slug(),
                    agent: created.id.clone(),
                    finished: false,
                    outstanding_action: false,
                    state: json!({}),
                    history: Vec::new(),
                    outcome: None,
                })
                .unwrap();
            session
                .save_aggregate(&AgentAggregate {
                    id: created.id.clone(),
                    total_runs: 1,
                    fully_evaluated: false,
                    recent_results: vec![1.0],
                    current_rating: 1.0,
                    best_rating: 1.0,
                    recently_finished_runs: vec![run_id],
                })
                .unwrap();
            session.commit().unwrap();
            run_id
        };

        delete_environment(&store, &env_slug()).unwrap();

        let mut session = store.begin().unwrap();
        assert!(session.load_environment(&env_slug()).is_err());
        assert!(session.load_account(&created.id).is_err());
        assert!(session.load_aggregate(&created.id).unwrap().is_none());
        assert!(session.load_run(run_id).is_err());
    }

    #[test]
    fn delete_environment_rejects_an_unknown_environment() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = delete_environment(&store, &env_slug()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownEnvironment(_)));
    }
}
