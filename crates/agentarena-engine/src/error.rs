// crates/agentarena-engine/src/error.rs
// ============================================================================
// Module: Engine Errors
// Description: Batch-aborting error taxonomy and HTTP status classification.
// Purpose: Let an embedding transport map failures to status codes without
//          this crate depending on an HTTP framework.
// Dependencies: agentarena-core, agentarena-contract, thiserror
// ============================================================================

//! ## Overview
//! Per-action failures (invalid run id, wrong `act_no`, a rejected action)
//! never reach [`EngineError`] — they are recorded as [`agentarena_contract::Message`]
//! entries and the batch continues. [`EngineError`] is reserved for failures
//! that abort the whole batch: authentication, validation and not-found.

use agentarena_core::capability::CapabilityError;
use agentarena_core::identifiers::IdentifierError;
use agentarena_core::store::StoreError;

/// Failures that abort an entire batch rather than being recorded as a
/// per-action [`agentarena_contract::Message`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No environment is registered under the requested slug.
    #[error("no such environment {0:?}")]
    UnknownEnvironment(String),
    /// No agent account exists under the requested identifier.
    #[error("unknown agent {0:?}")]
    UnknownAgent(String),
    /// The agent account exists but its password did not verify.
    #[error("wrong password")]
    WrongPassword,
    /// The agent account is locked.
    #[error("agent account is blocked")]
    AgentBlocked,
    /// None of the configured admin hashes verified against the supplied
    /// password.
    #[error("admin authorization is required")]
    AdminAuthFailed,
    /// The request body failed structural or semantic validation.
    #[error("invalid request: {0}")]
    Validation(String),
    /// `to_abandon` was non-empty but the environment does not support it.
    #[error("this environment does not support abandoning runs")]
    AbandonNotSupported,
    /// An unsupported `protocol_version` was requested.
    #[error("unsupported protocol version {0}")]
    UnsupportedProtocolVersion(u32),
    /// A malformed V0 run reference was encountered outside a per-action
    /// context (e.g. during request normalization).
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    /// No capability factory is registered for the environment's class, or
    /// its configuration failed validation.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    /// The persistent store reported a failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// HTTP status family an [`EngineError`] would be surfaced as, without this
/// crate depending on an HTTP framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusHint {
    /// 400.
    BadRequest,
    /// 401.
    Unauthorized,
    /// 404.
    NotFound,
    /// 500.
    Internal,
}

impl EngineError {
    /// Classifies this error for an embedding transport's status-code
    /// mapping.
    #[must_use]
    pub const fn status_hint(&self) -> StatusHint {
        match self {
            Self::UnknownEnvironment(_) => StatusHint::NotFound,
            Self::UnknownAgent(_) | Self::WrongPassword | Self::AgentBlocked | Self::AdminAuthFailed => {
                StatusHint::Unauthorized
            }
            Self::Validation(_) | Self::AbandonNotSupported | Self::UnsupportedProtocolVersion(_) | Self::Identifier(_) => {
                StatusHint::BadRequest
            }
            Self::Capability(CapabilityError::UnknownClass(_)) => StatusHint::NotFound,
            Self::Capability(CapabilityError::InvalidConfig(_)) | Self::Store(_) => StatusHint::Internal,
        }
    }
}
