// crates/agentarena-core/src/model.rs
// ============================================================================
// Module: Agent Arena Data Model
// Description: Record shapes for environments, agent accounts/aggregates and runs.
// Purpose: Shared, storage-agnostic domain types used by the store, registry
//          and dispatcher crates.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every opaque per-environment payload (`state`, `action`, `percept`,
//! `extra_info`, `outcome`) is carried as [`serde_json::Value`] at this
//! boundary; the dispatcher never interprets it, only the environment
//! capability does.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::AgentId;
use crate::identifiers::EnvSlug;
use crate::identifiers::RunId;

/// Signup policy for an environment record.
///
/// # Invariants
/// - `Restricted` is the only variant the original system exposes; kept as
///   an enum rather than a bare string so a future policy is a type-checked
///   addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignupPolicy {
    /// Accounts may only be created by an admin.
    Restricted,
}

/// Lifecycle status of an environment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentStatus {
    /// The environment accepts new runs and actions.
    Active,
}

/// A registered environment.
///
/// # Invariants
/// - `slug` is immutable once created; an environment outlives every run
///   and agent account that references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    /// Short, URL-safe identifier for the environment.
    pub slug: EnvSlug,
    /// Reference string resolved by the capability registry.
    pub env_class: String,
    /// Human-facing name.
    pub display_name: String,
    /// Opaque display-grouping hint; unused by the dispatcher, retained for
    /// store-schema fidelity with the system this was distilled from.
    pub display_group: Option<String>,
    /// Opaque configuration blob passed to the capability at construction.
    pub config: Value,
    /// Account signup policy.
    pub signup: SignupPolicy,
    /// Environment lifecycle status.
    pub status: EnvironmentStatus,
}

/// Lock state of an agent account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    /// The account may not submit actions.
    Locked,
    /// The account may submit actions.
    Active,
}

/// An agent's credential record.
///
/// # Invariants
/// - `id` is immutable; `password_hash` is always prefix-tagged
///   (`sha256:<hex>`, see `agentarena-engine::auth`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAccount {
    /// Composite `<env>/<agent>` identifier.
    pub id: AgentId,
    /// Prefix-tagged password hash.
    pub password_hash: String,
    /// Lock state.
    pub status: AgentStatus,
}

/// Strategy used to fold `recent_results` into `current_rating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingStrategy {
    /// Arithmetic mean of the retained results.
    Average,
}

/// Direction in which `best_rating` is optimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingObjective {
    /// Larger ratings are better.
    Max,
    /// Smaller ratings are better.
    Min,
}

impl RatingObjective {
    /// Picks the extremum of `current` and `candidate` per this objective.
    #[must_use]
    pub fn extremum(self, current: f64, candidate: f64) -> f64 {
        match self {
            Self::Max => current.max(candidate),
            Self::Min => current.min(candidate),
        }
    }
}

/// Declarative, immutable-per-plugin settings a capability exposes.
///
/// # Invariants
/// - `number_of_action_requests >= 1`; `min_runs_for_fully_evaluated >= 1`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnvSettings {
    /// Rating assigned before any run has finished.
    pub initial_rating: f64,
    /// How `recent_results` is folded into `current_rating`.
    pub rating_strategy: RatingStrategy,
    /// Number of retained results before an agent is "fully evaluated".
    pub min_runs_for_fully_evaluated: u32,
    /// Direction `best_rating` is optimized in.
    pub rating_objective: RatingObjective,
    /// Maximum concurrent outstanding runs offered to one agent.
    pub number_of_action_requests: u32,
    /// Whether `AbandonAction` is accepted for this environment.
    pub can_abandon_runs: bool,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            initial_rating: 0.0,
            rating_strategy: RatingStrategy::Average,
            min_runs_for_fully_evaluated: 50,
            rating_objective: RatingObjective::Max,
            number_of_action_requests: 5,
            can_abandon_runs: false,
        }
    }
}

/// An agent's per-run rating accumulator.
///
/// # Invariants
/// - `total_runs` is monotone non-decreasing.
/// - `fully_evaluated` is latched: once `true` it never returns to `false`.
/// - `recent_results.len() <= min_runs_for_fully_evaluated` at all times
///   (enforced by the caller truncating before persisting).
/// - `recently_finished_runs.len() <= 20`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAggregate {
    /// Composite `<env>/<agent>` identifier, shared with the account.
    pub id: AgentId,
    /// Number of runs that have reached `FINISHED` for this agent.
    pub total_runs: u64,
    /// Latched once `total_runs >= min_runs_for_fully_evaluated`.
    pub fully_evaluated: bool,
    /// Bounded, oldest-first window of outcomes.
    pub recent_results: Vec<f64>,
    /// Bounded, oldest-first window of finished run ids.
    pub recently_finished_runs: Vec<RunId>,
    /// Mean of `recent_results` under `rating_strategy`.
    pub current_rating: f64,
    /// Latched extremum of `current_rating` once `fully_evaluated`.
    pub best_rating: f64,
}

impl AgentAggregate {
    /// Creates a freshly seeded aggregate for an agent with no finished runs.
    #[must_use]
    pub fn seeded(id: AgentId, settings: &EnvSettings) -> Self {
        Self {
            id,
            total_runs: 0,
            fully_evaluated: false,
            recent_results: Vec::new(),
            recently_finished_runs: Vec::new(),
            current_rating: settings.initial_rating,
            best_rating: settings.initial_rating,
        }
    }
}

/// One entry in a run's append-only action history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionHistoryEntry {
    /// The action payload as submitted by the agent.
    pub action: Value,
    /// Optional capability-supplied annotation for this step.
    pub extra_info: Option<String>,
}

/// Durable record for a single run.
///
/// # Invariants
/// - `finished` is monotone: once `true`, subsequent writes must preserve it.
/// - `finished => outcome.is_some()`.
/// - `finished => !outstanding_action`.
/// - `act_no` (the act number expected on the next submission) always equals
///   `history.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Store-assigned identifier.
    pub id: RunId,
    /// Owning environment, immutable.
    pub env: EnvSlug,
    /// Owning agent, immutable.
    pub agent: AgentId,
    /// Monotone terminal flag.
    pub finished: bool,
    /// Whether this run currently appears in an outstanding action-request.
    pub outstanding_action: bool,
    /// Opaque, capability-owned state.
    pub state: Value,
    /// Append-only action history.
    pub history: Vec<ActionHistoryEntry>,
    /// Set exactly once, simultaneously with `finished = true`.
    pub outcome: Option<f64>,
}

impl RunRecord {
    /// The act number a submission against this run must present.
    #[must_use]
    pub fn act_no(&self) -> u32 {
        u32::try_from(self.history.len()).unwrap_or(u32::MAX)
    }
}

/// Read-only view of a run passed to the environment capability.
///
/// Mirrors the `RunData` the original dispatcher builds before invoking
/// `act`/`get_action_request`: materialized history, current state, the
/// agent's bare display name and the run id.
#[derive(Debug, Clone)]
pub struct RunData {
    /// The run's identifier.
    pub run_id: RunId,
    /// Materialized action history.
    pub history: Vec<ActionHistoryEntry>,
    /// Current opaque state.
    pub state: Value,
    /// Outcome if the run has already finished (only set for view hooks).
    pub outcome: Option<f64>,
    /// Agent's bare display name (environment prefix stripped).
    pub agent_display_name: String,
}

/// Outcome of invoking a capability's `act`.
///
/// `new_state = None` means the action was rejected; the capability must
/// signal rejection this way rather than by raising.
#[derive(Debug, Clone)]
pub struct ActionResult {
    /// Updated opaque state, or `None` if the action was rejected.
    pub new_state: Option<Value>,
    /// Human-readable message; an error message when `new_state` is `None`.
    pub message: Option<String>,
    /// Extra annotation recorded alongside the history entry.
    pub action_extra_info: Option<String>,
    /// Non-`None` terminates the run.
    pub outcome: Option<f64>,
}

/// Agent-visible projection of a run, returned by `get_action_request`.
#[derive(Debug, Clone)]
pub struct Percept {
    /// Opaque, capability-chosen payload shown to the agent.
    pub content: Value,
}
