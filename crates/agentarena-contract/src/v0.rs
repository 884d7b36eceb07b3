// crates/agentarena-contract/src/v0.rs
// ============================================================================
// Module: Wire Protocol V0 (legacy)
// Description: Pre-V1 request/response shapes, kept for backward compatibility.
// Purpose: Give old clients a stable surface while the dispatcher only ever
//          operates on V1.
// Dependencies: serde, serde_json, agentarena-core
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use agentarena_core::identifiers::RunRef;

/// A V0 submitted action; `run` encodes both run id and act number as
/// `"<rid>#<act_no>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionV0 {
    /// `"<rid>#<act_no>"` run reference.
    pub run: String,
    /// Opaque action payload.
    pub action: Value,
}

/// A V0 outgoing action-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequestV0 {
    /// `"<rid>#<act_no>"` run reference.
    pub run: String,
    /// The agent-visible percept for this run.
    pub percept: Value,
}

/// V0 request body. `protocol_version` defaults to `0` when absent, which is
/// how a caller distinguishes V0 from V1 on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestV0 {
    /// Wire protocol version; `0` (or absent) selects this type.
    #[serde(default)]
    pub protocol_version: u32,
    /// Bare agent name.
    pub agent: String,
    /// Agent password.
    pub pwd: Option<String>,
    /// Actions to apply, in submission order.
    #[serde(default)]
    pub actions: Vec<ActionV0>,
    /// `false` (the default) requests up to `NUMBER_OF_ACTION_REQUESTS`
    /// outstanding runs at once; `true` requests only a single run.
    #[serde(default)]
    pub single_request: bool,
    /// Opaque client identifier.
    #[serde(default)]
    pub client: Option<String>,
}

/// V0 response body. Field names use dashed aliases on this wire version.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseV0 {
    /// The next batch of action-requests offered to the agent.
    #[serde(rename = "action-requests")]
    pub action_requests: Vec<ActionRequestV0>,
    /// Flattened `type=error` messages, rendered as
    /// `"error: Run <rid>: <content>"`.
    pub errors: Vec<String>,
    /// Flattened `warning`/`info` messages, rendered the same way.
    pub messages: Vec<String>,
}

impl ActionV0 {
    /// Splits the `"<rid>#<act_no>"` run reference.
    ///
    /// # Errors
    /// Propagates [`agentarena_core::identifiers::IdentifierError`] if
    /// `run` is malformed.
    pub fn run_ref(&self) -> Result<RunRef, agentarena_core::identifiers::IdentifierError> {
        self.run.parse()
    }
}
