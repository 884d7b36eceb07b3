// crates/agentarena-contract/src/v1.rs
// ============================================================================
// Module: Wire Protocol V1
// Description: Canonical request/response shapes the dispatcher operates on.
// Purpose: Give the dispatcher a single normalized wire shape; V0 is always
//          converted to this before dispatch and back afterward.
// Dependencies: serde, serde_json, agentarena-core
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use agentarena_core::identifiers::RunId;

use crate::message::Message;

/// One submitted action against an outstanding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionV1 {
    /// The run this action targets.
    pub run: RunId,
    /// The act number the client believes the run is at.
    pub act_no: u32,
    /// Opaque action payload, interpreted only by the environment capability.
    pub action: Value,
}

/// An outgoing action-request offered to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequestV1 {
    /// The offered run.
    pub run: RunId,
    /// The act number the client must echo back with its action.
    pub act_no: u32,
    /// The agent-visible percept for this run.
    pub percept: Value,
}

/// Canonical, normalized request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestV1 {
    /// Wire protocol version; always `1` on this type.
    pub protocol_version: u32,
    /// Bare agent name (no environment prefix).
    pub agent: String,
    /// Agent password, checked against the stored hash.
    pub pwd: Option<String>,
    /// Actions to apply, in submission order.
    #[serde(default)]
    pub actions: Vec<ActionV1>,
    /// Runs the agent wishes to voluntarily forfeit.
    #[serde(default)]
    pub to_abandon: Vec<RunId>,
    /// Whether up to `NUMBER_OF_ACTION_REQUESTS` runs may be outstanding at
    /// once, rather than just one.
    #[serde(default = "default_true")]
    pub parallel_runs: bool,
    /// Opaque client identifier, passed through for diagnostics only.
    #[serde(default)]
    pub client: Option<String>,
}

/// Serde default for [`RequestV1::parallel_runs`].
const fn default_true() -> bool {
    true
}

/// Canonical, normalized response body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseV1 {
    /// The next batch of action-requests offered to the agent.
    pub action_requests: Vec<ActionRequestV1>,
    /// Every currently-unfinished run id owned by the agent, not just the
    /// ones in `action_requests`.
    pub active_runs: Vec<RunId>,
    /// Per-action diagnostics; never causes the batch to abort.
    pub messages: Vec<Message>,
    /// Runs that finished during this batch, mapped to their outcome.
    pub finished_runs: BTreeMap<RunId, f64>,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]
mod tests {
    use super::*;

    #[test]
    fn parallel_runs_defaults_to_true_when_absent_on_the_wire() {
        let body = serde_json::json!({
            "protocol_version": 1,
            "agent": "nimplayer",
            "pwd": "secret",
        });
        let req: RequestV1 = serde_json::from_value(body).unwrap();
        assert!(req.parallel_runs);
    }
}
