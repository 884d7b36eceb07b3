// crates/agentarena-core/src/capability.rs
// ============================================================================
// Module: Environment Capability
// Description: Pluggable adapter interface implemented by every environment.
// Purpose: Give the dispatcher a uniform, storage-agnostic seam over
//          environment-specific rules without leaking their types.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A capability is the only place environment-specific logic lives. The
//! dispatcher drives it purely through this trait and never inspects the
//! opaque `state`/`action`/`outcome` values it produces or consumes.
//!
//! # Invariants
//! - `act` must never raise for an invalid action; rejection is signaled by
//!   returning [`ActionResult::new_state`] as `None`.
//! - `get_action_request` must be a pure function of the supplied
//!   [`RunData`].
//! - `get_abandon_outcome` is only invoked when `settings().can_abandon_runs`
//!   is `true`.

use crate::model::ActionResult;
use crate::model::EnvSettings;
use crate::model::Percept;
use crate::model::RunData;
use serde_json::Value;

/// Errors a capability may report when constructed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CapabilityError {
    /// No factory is registered for the requested environment-class reference.
    #[error("unknown environment class: {0:?}")]
    UnknownClass(String),
    /// The stored configuration blob failed capability-specific validation.
    #[error("invalid environment configuration: {0}")]
    InvalidConfig(String),
}

/// Pluggable environment rules, one instance constructed per request.
///
/// Implementations must be stateless beyond their immutable settings and
/// configuration: the dispatcher constructs a fresh instance per call and
/// never caches one across requests.
pub trait EnvironmentCapability: Send + Sync {
    /// Declarative settings, immutable for the lifetime of this plugin.
    fn settings(&self) -> EnvSettings;

    /// Produces the initial opaque state for a fresh run. May be
    /// non-deterministic.
    fn new_run(&self) -> Value;

    /// Applies `action` to `run_data`, returning the result. Must not raise
    /// for an invalid action; see the invalid-action contract above.
    fn act(&self, action: &Value, run_data: &RunData) -> ActionResult;

    /// Projects `run_data` to the percept shown to the agent.
    fn get_action_request(&self, run_data: &RunData) -> Percept;

    /// Outcome recorded when an agent voluntarily abandons a run. Only
    /// called when `settings().can_abandon_runs` is `true`.
    fn get_abandon_outcome(&self, run_data: &RunData) -> f64 {
        let _ = run_data;
        0.0
    }

    /// Optional rendering hook for a single run; not required by the core.
    fn view_run(&self, run_data: &RunData) -> Option<String> {
        let _ = run_data;
        None
    }
}

/// Factory that constructs a capability instance from an environment's
/// stored configuration blob.
pub trait EnvironmentCapabilityFactory: Send + Sync {
    /// Builds a capability instance bound to `config`.
    ///
    /// # Errors
    /// Returns [`CapabilityError::InvalidConfig`] if `config` fails
    /// capability-specific validation.
    fn build(&self, config: &Value) -> Result<Box<dyn EnvironmentCapability>, CapabilityError>;
}
