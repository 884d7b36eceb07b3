// crates/agentarena-engine/src/dispatcher.rs
// ============================================================================
// Module: Action Dispatcher
// Description: Ingests a normalized batch request, drives the run state
//              machine and agent aggregate through the environment
//              capability, and emits the next action-request batch.
// Purpose: The core of the action-dispatch and run-lifecycle engine.
// Dependencies: agentarena-core, agentarena-contract, agentarena-registry
// ============================================================================

//! ## Overview
//! [`ActManager::process_batch`] loads each referenced run
//! ([`ActManager::load_run_for_action`]), applies its action
//! ([`ActManager::apply_action`]), folds the outcome
//! ([`ActManager::process_one`], [`ActManager::fold_outcome_into_aggregate`])
//! and assembles the next batch ([`ActManager::build_action_requests`]).
//! Each submitted action and each new-run creation opens its own store
//! transaction, so one malformed action cannot poison subsequent ones and
//! the engine stays safe to parallelize across distinct agents' actions.

use std::collections::BTreeMap;
use std::time::Instant;

use agentarena_contract::Message;
use agentarena_contract::MessageType;
use agentarena_contract::v1::ActionRequestV1;
use agentarena_contract::v1::ActionV1;
use agentarena_contract::v1::RequestV1;
use agentarena_contract::v1::ResponseV1;
use agentarena_core::capability::EnvironmentCapability;
use agentarena_core::identifiers::AgentId;
use agentarena_core::identifiers::AgentName;
use agentarena_core::identifiers::EnvSlug;
use agentarena_core::identifiers::RunId;
use agentarena_core::model::ActionHistoryEntry;
use agentarena_core::model::AgentAggregate;
use agentarena_core::model::EnvSettings;
use agentarena_core::model::EnvironmentStatus;
use agentarena_core::model::RatingStrategy;
use agentarena_core::model::RunData;
use agentarena_core::model::RunRecord;
use agentarena_core::store::PersistentStore;
use agentarena_core::store::StoreError;
use agentarena_core::store::StoreSession;
use agentarena_registry::CapabilityRegistry;
use serde_json::Value;

use crate::auth::authenticate_agent;
use crate::error::EngineError;
use crate::telemetry::ActionOutcome;
use crate::telemetry::AuthOutcome;
use crate::telemetry::EngineMetrics;

/// Maximum length retained for an agent's and an environment's bounded
/// recent-runs sequences.
const RECENT_RUNS_WINDOW: usize = 20;

/// Infrequent housekeeping trigger; intentionally large so cleanup does not
/// run often enough to disturb debugging.
const CLEANUP_MODULUS: u64 = 2351;

/// A single pending unit of work within a batch: a submitted action or a
/// voluntary abandon.
enum PendingAction {
    /// A submitted action to apply to the named run.
    Submit(ActionV1),
    /// A voluntary abandon of the named run.
    Abandon(RunId),
}

impl PendingAction {
    const fn run(&self) -> RunId {
        match self {
            Self::Submit(a) => a.run,
            Self::Abandon(r) => *r,
        }
    }
}

/// Drives the action-dispatch and run-lifecycle engine for one environment.
///
/// Stateless beyond the borrowed store/registry/metrics handles; a fresh
/// [`ActManager`] is cheap to construct per incoming batch.
pub struct ActManager<'a> {
    /// Backing persistent store.
    store: &'a dyn PersistentStore,
    /// Environment capability registry.
    registry: &'a CapabilityRegistry,
    /// Metrics sink for dispatch/auth events.
    metrics: &'a dyn EngineMetrics,
}

impl<'a> ActManager<'a> {
    /// Builds a dispatcher over the given store, capability registry and
    /// metrics sink.
    #[must_use]
    pub const fn new(store: &'a dyn PersistentStore, registry: &'a CapabilityRegistry, metrics: &'a dyn EngineMetrics) -> Self {
        Self { store, registry, metrics }
    }

    /// Processes one normalized batch request end to end: authenticates the
    /// agent, applies every abandon and submitted action in order, and
    /// returns the next action-request batch.
    ///
    /// # Errors
    /// Returns an [`EngineError`] that aborts the whole batch (authentication,
    /// validation, missing environment). Per-action failures never abort the
    /// batch; they are recorded in [`ResponseV1::messages`].
    pub fn process_batch(&self, env_slug: &EnvSlug, request: RequestV1) -> Result<ResponseV1, EngineError> {
        let agent_id = AgentId::new(env_slug.clone(), AgentName::parse(request.agent.clone())?);

        let capability = self.load_capability(env_slug)?;
        let settings = capability.settings();

        let account = {
            let mut session = self.store.begin()?;
            let account = session.load_account(&agent_id).map_err(|e| match e {
                StoreError::NotFound(_) => {
                    self.metrics.record_auth(AuthOutcome::Unknown);
                    EngineError::UnknownAgent(agent_id.to_string())
                }
                other => EngineError::Store(other),
            })?;
            session.commit()?;
            account
        };
        if let Some(err) = authenticate_agent(&account, request.pwd.as_deref().unwrap_or(""), self.metrics).into_error() {
            return Err(err);
        }

        if !request.to_abandon.is_empty() && !settings.can_abandon_runs {
            return Err(EngineError::AbandonNotSupported);
        }

        let mut messages = Vec::new();
        let mut finished_runs = BTreeMap::new();

        for run_id in &request.to_abandon {
            self.process_one(
                &agent_id,
                capability.as_ref(),
                &settings,
                PendingAction::Abandon(*run_id),
                &mut messages,
                &mut finished_runs,
            )?;
        }
        for action in &request.actions {
            self.process_one(
                &agent_id,
                capability.as_ref(),
                &settings,
                PendingAction::Submit(action.clone()),
                &mut messages,
                &mut finished_runs,
            )?;
        }

        let (action_requests, active_runs) =
            self.build_action_requests(&agent_id, capability.as_ref(), &settings, request.parallel_runs)?;

        Ok(ResponseV1 { action_requests, active_runs, messages, finished_runs })
    }

    /// Resolves `env_slug` to a capability instance, enforcing environment
    /// existence and active-status gating.
    fn load_capability(&self, env_slug: &EnvSlug) -> Result<Box<dyn EnvironmentCapability>, EngineError> {
        let record = {
            let mut session = self.store.begin()?;
            let record = session.load_environment(env_slug).map_err(|e| match e {
                StoreError::NotFound(_) => EngineError::UnknownEnvironment(env_slug.to_string()),
                other => EngineError::Store(other),
            })?;
            session.commit()?;
            record
        };
        if record.status != EnvironmentStatus::Active {
            return Err(EngineError::UnknownEnvironment(env_slug.to_string()));
        }
        Ok(self.registry.build(&record.env_class, &record.config)?)
    }

    /// Applies one submitted action or abandon, in its own store transaction.
    ///
    /// Mirrors `ActManager.process_action`: loads and validates the run,
    /// invokes the capability (or `get_abandon_outcome`), and commits the
    /// result. Any failure short of a backend error is recorded as a
    /// [`Message`] and the run is left untouched (the session is dropped
    /// without committing).
    fn process_one(
        &self,
        agent_id: &AgentId,
        capability: &dyn EnvironmentCapability,
        settings: &EnvSettings,
        action: PendingAction,
        messages: &mut Vec<Message>,
        finished_runs: &mut BTreeMap<RunId, f64>,
    ) -> Result<(), EngineError> {
        let run_id = action.run();
        let mut session = self.store.begin()?;

        let run = match session.load_run(run_id) {
            Ok(run) => run,
            Err(StoreError::NotFound(_)) => {
                messages.push(Message::new(MessageType::Error, Some(run_id), "Invalid run id"));
                return Ok(());
            }
            Err(other) => return Err(EngineError::Store(other)),
        };
        if run.agent != *agent_id {
            messages.push(Message::new(MessageType::Error, Some(run_id), "This run does not belong to your agent"));
            return Ok(());
        }
        if run.finished {
            messages.push(Message::new(MessageType::Error, Some(run_id), "Invalid run id"));
            return Ok(());
        }
        if let PendingAction::Submit(submitted) = &action {
            if submitted.act_no != run.act_no() {
                messages.push(Message::new(
                    MessageType::Error,
                    Some(run_id),
                    format!(
                        "Wrong action number {} (the action might have been for an earlier action request)",
                        submitted.act_no
                    ),
                ));
                self.metrics.record_action(agent_id.env().as_str(), ActionOutcome::StaleActNo);
                return Ok(());
            }
        }

        let run_data = RunData {
            run_id: run.id,
            history: run.history.clone(),
            state: run.state.clone(),
            outcome: None,
            agent_display_name: agent_id.name().as_str().to_owned(),
        };

        let mut updated = run;
        let mut outcome_for_cleanup = None;

        match action {
            PendingAction::Abandon(_) => {
                let outcome = capability.get_abandon_outcome(&run_data);
                messages.push(Message::new(MessageType::Warning, Some(run_id), "Run abandoned (as requested by client)"));
                finished_runs.insert(run_id, outcome);
                updated.finished = true;
                updated.outcome = Some(outcome);
                outcome_for_cleanup = Some(outcome);
                self.metrics.record_action(agent_id.env().as_str(), ActionOutcome::Abandoned);
            }
            PendingAction::Submit(submitted) => {
                let result = capability.act(&submitted.action, &run_data);
                let Some(new_state) = result.new_state else {
                    let content =
                        result.message.unwrap_or_else(|| "Internal server error when trying to update the state".to_owned());
                    messages.push(Message::new(MessageType::Error, Some(run_id), content));
                    self.metrics.record_action(agent_id.env().as_str(), ActionOutcome::IllegalAction);
                    return Ok(());
                };
                if let Some(info) = result.message {
                    messages.push(Message::new(MessageType::Info, Some(run_id), info));
                }
                updated.state = new_state;
                updated.history.push(ActionHistoryEntry { action: submitted.action, extra_info: result.action_extra_info });
                if let Some(outcome) = result.outcome {
                    finished_runs.insert(run_id, outcome);
                    updated.finished = true;
                    updated.outcome = Some(outcome);
                    outcome_for_cleanup = Some(outcome);
                }
                self.metrics.record_action(agent_id.env().as_str(), ActionOutcome::Applied);
            }
        }

        updated.outstanding_action = false;
        session.save_run(&updated)?;

        let mut do_cleanup = false;
        if let Some(outcome) = outcome_for_cleanup {
            do_cleanup = self.fold_outcome_into_aggregate(&mut *session, agent_id, settings, run_id, outcome)?;
        }
        session.commit()?;

        if do_cleanup {
            self.run_cleanup(agent_id)?;
        }
        Ok(())
    }

    /// Folds a terminal outcome into the agent's rating aggregate: increment
    /// `total_runs`, latch `fully_evaluated`, truncate/append
    /// `recent_results`, recompute `current_rating`, then conditionally fold
    /// `best_rating` only once `fully_evaluated` is already true at that
    /// point.
    ///
    /// Returns whether the cleanup trigger (`total_runs % 2351 == 0`) fired.
    fn fold_outcome_into_aggregate(
        &self,
        session: &mut dyn StoreSession,
        agent_id: &AgentId,
        settings: &EnvSettings,
        run_id: RunId,
        outcome: f64,
    ) -> Result<bool, EngineError> {
        let mut aggregate = session.load_aggregate(agent_id)?.unwrap_or_else(|| AgentAggregate::seeded(agent_id.clone(), settings));

        aggregate.total_runs += 1;
        if aggregate.total_runs >= u64::from(settings.min_runs_for_fully_evaluated) {
            aggregate.fully_evaluated = true;
        }

        aggregate.recent_results.push(outcome);
        truncate_front(&mut aggregate.recent_results, settings.min_runs_for_fully_evaluated as usize);

        aggregate.current_rating = match settings.rating_strategy {
            RatingStrategy::Average => {
                aggregate.recent_results.iter().sum::<f64>() / aggregate.recent_results.len() as f64
            }
        };

        if aggregate.fully_evaluated {
            aggregate.best_rating = settings.rating_objective.extremum(aggregate.best_rating, aggregate.current_rating);
        }

        aggregate.recently_finished_runs.push(run_id);
        truncate_front(&mut aggregate.recently_finished_runs, RECENT_RUNS_WINDOW);

        session.save_aggregate(&aggregate)?;

        let recent_key = format!("{}#recentruns", agent_id.env());
        let mut recent_runs: Vec<i64> = match session.kv_get(&recent_key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| EngineError::Store(StoreError::Corrupt(e.to_string())))?,
            None => Vec::new(),
        };
        recent_runs.push(run_id.get());
        truncate_front(&mut recent_runs, RECENT_RUNS_WINDOW);
        let serialized = serde_json::to_string(&recent_runs).map_err(|e| EngineError::Store(StoreError::Corrupt(e.to_string())))?;
        session.kv_set(&recent_key, &serialized)?;

        Ok(aggregate.total_runs % CLEANUP_MODULUS == 0)
    }

    /// Deletes finished runs not in the agent's retained recent-runs window
    /// and reclaims the freed space, in its own transaction.
    fn run_cleanup(&self, agent_id: &AgentId) -> Result<(), EngineError> {
        let started = Instant::now();
        let mut session = self.store.begin()?;
        let keep = session.load_aggregate(agent_id)?.map(|a| a.recently_finished_runs).unwrap_or_default();
        let deleted = session.delete_nonrecent_runs(agent_id, &keep)?;
        session.commit()?;
        self.store.vacuum()?;
        self.metrics.record_cleanup(agent_id.env().as_str(), usize::try_from(deleted).unwrap_or(usize::MAX), started.elapsed());
        Ok(())
    }

    /// Computes the outgoing action-request batch: re-offers outstanding
    /// runs first; otherwise creates fresh runs up to `max_requests`, one
    /// store transaction per creation.
    fn build_action_requests(
        &self,
        agent_id: &AgentId,
        capability: &dyn EnvironmentCapability,
        settings: &EnvSettings,
        parallel_runs: bool,
    ) -> Result<(Vec<ActionRequestV1>, Vec<RunId>), EngineError> {
        let max_requests = if parallel_runs { settings.number_of_action_requests as usize } else { 1 };

        let mut runs = {
            let mut session = self.store.begin()?;
            let runs = session.list_unfinished_runs(agent_id)?;
            session.commit()?;
            runs
        };

        let has_outstanding = runs.iter().any(|r| r.outstanding_action);

        if !has_outstanding {
            while runs.len() < max_requests {
                let state: Value = capability.new_run();
                let mut session = self.store.begin()?;
                let id = session.create_run(RunRecord {
                    id: RunId::new(1),
                    env: agent_id.env().clone(),
                    agent: agent_id.clone(),
                    finished: false,
                    outstanding_action: false,
                    state: state.clone(),
                    history: Vec::new(),
                    outcome: None,
                })?;
                session.commit()?;
                runs.push(RunRecord {
                    id,
                    env: agent_id.env().clone(),
                    agent: agent_id.clone(),
                    finished: false,
                    outstanding_action: false,
                    state,
                    history: Vec::new(),
                    outcome: None,
                });
            }
        }

        let active_runs: Vec<RunId> = runs.iter().map(|r| r.id).collect();

        let mut selected = runs;
        if has_outstanding {
            selected.retain(|r| r.outstanding_action);
        }
        selected.truncate(max_requests);

        let mut session = self.store.begin()?;
        let mut action_requests = Vec::with_capacity(selected.len());
        for run in &mut selected {
            run.outstanding_action = true;
            session.save_run(run)?;
            let run_data = RunData {
                run_id: run.id,
                history: run.history.clone(),
                state: run.state.clone(),
                outcome: None,
                agent_display_name: agent_id.name().as_str().to_owned(),
            };
            let percept = capability.get_action_request(&run_data);
            action_requests.push(ActionRequestV1 { run: run.id, act_no: run.act_no(), percept: percept.content });
        }
        session.commit()?;

        Ok((action_requests, active_runs))
    }
}

/// Drops elements from the front of `values` until its length is at most
/// `limit`, preserving an "oldest first, bounded window" shape for
/// `recent_results`/`recently_finished_runs`.
fn truncate_front<T>(values: &mut Vec<T>, limit: usize) {
    if values.len() > limit {
        let excess = values.len() - limit;
        values.drain(0..excess);
    }
}
