// crates/agentarena-engine/src/telemetry.rs
// ============================================================================
// Module: Engine Telemetry
// Description: Observability hooks for action dispatch and admin operations.
// Purpose: Provide metric events without a hard logging-crate dependency.
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for dispatcher and admin
//! counters. It is intentionally dependency-light so downstream deployments
//! can plug in Prometheus or `OpenTelemetry` without redesign.

use std::time::Duration;

/// Action-dispatch outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action was applied and the run advanced.
    Applied,
    /// The submitted `act_no` did not match the run's history length.
    StaleActNo,
    /// The environment capability rejected the action as illegal.
    IllegalAction,
    /// The run was abandoned by request.
    Abandoned,
}

impl ActionOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::StaleActNo => "stale_act_no",
            Self::IllegalAction => "illegal_action",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Authentication check outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials matched.
    Ok,
    /// Credentials did not match.
    Denied,
    /// The referenced agent or admin account does not exist.
    Unknown,
}

impl AuthOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Denied => "denied",
            Self::Unknown => "unknown",
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for dispatcher and admin events.
pub trait EngineMetrics: Send + Sync {
    /// Records an action-dispatch outcome.
    fn record_action(&self, env: &str, outcome: ActionOutcome);
    /// Records an authentication check outcome.
    fn record_auth(&self, outcome: AuthOutcome);
    /// Records a cleanup sweep and how long it took.
    fn record_cleanup(&self, env: &str, deleted: usize, elapsed: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl EngineMetrics for NoopMetrics {
    fn record_action(&self, _env: &str, _outcome: ActionOutcome) {}

    fn record_auth(&self, _outcome: AuthOutcome) {}

    fn record_cleanup(&self, _env: &str, _deleted: usize, _elapsed: Duration) {}
}
