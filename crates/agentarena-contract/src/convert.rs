// crates/agentarena-contract/src/convert.rs
// ============================================================================
// Module: Protocol Conversion
// Description: Lossless translation between wire V0 and the canonical V1 shape.
// Purpose: Let the dispatcher see only V1 while both wire versions stay fully
//          representable.
// Dependencies: agentarena-core, serde_json
// ============================================================================

//! ## Overview
//! V0→V1 is total: every V0 request converts to an equivalent V1 request.
//! V1→V0 is lossy only in the fields V0 cannot carry (`active_runs`,
//! `finished_runs`); everything else round-trips exactly.

use agentarena_core::identifiers::RunRef;

use crate::message::MessageType;
use crate::v0::ActionRequestV0;
use crate::v0::ActionV0;
use crate::v0::RequestV0;
use crate::v0::ResponseV0;
use crate::v1::ActionV1;
use crate::v1::RequestV1;
use crate::v1::ResponseV1;

/// Errors raised while normalizing or denormalizing a wire payload.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// `protocol_version` was neither `0` nor `1`.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u32),
    /// A V0 `"<rid>#<act_no>"` run reference could not be parsed.
    #[error(transparent)]
    MalformedRunRef(#[from] agentarena_core::identifiers::IdentifierError),
}

impl RequestV0 {
    /// Normalizes this legacy request into the canonical V1 shape.
    ///
    /// `single_request=false` maps to `parallel_runs=true` and vice versa;
    /// V0 requests carry no `to_abandon` list.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedRunRef`] if any action's `run`
    /// field is not a well-formed `"<rid>#<act_no>"` reference.
    pub fn to_v1(&self) -> Result<RequestV1, ProtocolError> {
        let actions = self.actions.iter().map(ActionV0::to_v1).collect::<Result<Vec<_>, ProtocolError>>()?;
        Ok(RequestV1 {
            protocol_version: 1,
            agent: self.agent.clone(),
            pwd: self.pwd.clone(),
            actions,
            to_abandon: Vec::new(),
            parallel_runs: !self.single_request,
            client: self.client.clone(),
        })
    }
}

impl ResponseV1 {
    /// Denormalizes this response into the legacy V0 shape.
    ///
    /// `active_runs` and `finished_runs` have no V0 representation and are
    /// dropped; messages are bucketed into `errors`/`messages` by severity
    /// and rendered via [`Message::render_v0`].
    #[must_use]
    pub fn to_v0(&self) -> ResponseV0 {
        let action_requests = self
            .action_requests
            .iter()
            .map(|r| ActionRequestV0 {
                run: RunRef { run: r.run, act_no: r.act_no }.to_string(),
                percept: r.percept.clone(),
            })
            .collect();
        let mut errors = Vec::new();
        let mut messages = Vec::new();
        for m in &self.messages {
            let rendered = m.render_v0();
            if m.kind == MessageType::Error {
                errors.push(rendered);
            } else {
                messages.push(rendered);
            }
        }
        ResponseV0 { action_requests, errors, messages }
    }
}

impl ActionV0 {
    /// Normalizes this legacy action to its V1 shape.
    fn to_v1(&self) -> Result<ActionV1, ProtocolError> {
        let r: RunRef = self.run_ref()?;
        Ok(ActionV1 { run: r.run, act_no: r.act_no, action: self.action.clone() })
    }
}

/// A raw incoming body with its version resolved, ready to normalize.
///
/// `protocol_version` defaults to `0` when absent on the wire; callers
/// should deserialize the raw JSON body into this enum by first peeking
/// the `protocol_version` field.
#[derive(Debug, Clone)]
pub enum VersionedRequest {
    /// Legacy V0 request.
    V0(RequestV0),
    /// Canonical V1 request.
    V1(RequestV1),
}

impl VersionedRequest {
    /// Normalizes to the canonical V1 shape regardless of the wire version.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedRunRef`] if a V0 run reference is
    /// malformed.
    pub fn into_v1(self) -> Result<RequestV1, ProtocolError> {
        match self {
            Self::V0(v0) => v0.to_v1(),
            Self::V1(v1) => Ok(v1),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::Message;
    use crate::v1::ActionRequestV1;

    fn sample_v0_action(run: &str) -> ActionV0 {
        ActionV0 { run: run.to_owned(), action: json!(2) }
    }

    #[test]
    fn v0_to_v1_splits_run_reference() {
        let req = RequestV0 {
            protocol_version: 0,
            agent: "a".to_owned(),
            pwd: Some("pw".to_owned()),
            actions: vec![sample_v0_action("42#3")],
            single_request: false,
            client: None,
        };
        let v1 = req.to_v1().expect("valid run ref");
        assert_eq!(v1.actions[0].run.get(), 42);
        assert_eq!(v1.actions[0].act_no, 3);
        assert!(v1.parallel_runs);
        assert!(v1.to_abandon.is_empty());
    }

    #[test]
    fn v0_to_v1_rejects_malformed_run() {
        let req = RequestV0 {
            protocol_version: 0,
            agent: "a".to_owned(),
            pwd: None,
            actions: vec![sample_v0_action("not-a-ref")],
            single_request: true,
            client: None,
        };
        assert!(req.to_v1().is_err());
    }

    #[test]
    fn v1_to_v0_drops_unrepresentable_fields_and_buckets_messages() {
        use agentarena_core::identifiers::RunId;
        use std::collections::BTreeMap;

        let mut finished_runs = BTreeMap::new();
        finished_runs.insert(RunId::new(7), 1.0);
        let resp = ResponseV1 {
            action_requests: vec![ActionRequestV1 { run: RunId::new(7), act_no: 1, percept: json!(10) }],
            active_runs: vec![RunId::new(7)],
            messages: vec![
                Message::new(MessageType::Error, Some(RunId::new(7)), "Wrong action number"),
                Message::new(MessageType::Warning, None, "Run abandoned"),
            ],
            finished_runs,
        };
        let v0 = resp.to_v0();
        assert_eq!(v0.action_requests[0].run, "7#1");
        assert_eq!(v0.errors, vec!["error: Run 7: Wrong action number".to_owned()]);
        assert_eq!(v0.messages, vec!["warning: Run abandoned".to_owned()]);
    }
}
