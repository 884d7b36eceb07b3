// crates/agentarena-contract/src/message.rs
// ============================================================================
// Module: Response Messages
// Description: Per-action diagnostics attached to a dispatcher response.
// Purpose: Give the client machine-readable severity without aborting a batch.
// Dependencies: serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use agentarena_core::identifiers::RunId;

/// Severity of a response [`Message`].
///
/// # Invariants
/// - Only `error` entries are ever routed to V0's `errors` list; the rest
///   become `messages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// The action did not succeed; the run's state is unchanged.
    Error,
    /// The action succeeded but the client should be informed of something
    /// noteworthy (e.g. a voluntary abandon).
    Warning,
    /// Purely informational.
    Info,
}

impl MessageType {
    /// Stable lowercase label, as rendered on both wire versions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A single diagnostic attached to a batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Severity.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// The run this message concerns, if any.
    pub run: Option<RunId>,
    /// Human-readable content.
    pub content: String,
}

impl Message {
    /// Builds a new message.
    #[must_use]
    pub fn new(kind: MessageType, run: Option<RunId>, content: impl Into<String>) -> Self {
        Self { kind, run, content: content.into() }
    }

    /// Renders this message the way V0's flat `errors`/`messages` string
    /// lists present it: `"<type>: Run <rid>: <content>"`, or
    /// `"<type>: <content>"` when no run is associated.
    #[must_use]
    pub fn render_v0(&self) -> String {
        match self.run {
            Some(run) => format!("{}: Run {}: {}", self.kind.as_str(), run, self.content),
            None => format!("{}: {}", self.kind.as_str(), self.content),
        }
    }
}
