// crates/agentarena-engine/src/auth.rs
// ============================================================================
// Module: Authentication Gate
// Description: Agent and admin password verification.
// Purpose: Gate every action batch on a verified, active agent account, and
//          every admin endpoint on a configured admin hash.
// Dependencies: agentarena-core, sha2
// ============================================================================

//! ## Overview
//! Password storage uses a prefix-tagged `sha256:<hex>` scheme: because the
//! server mints the password itself with high entropy, a fast hash is
//! sufficient and no per-password salt or work factor is required.
//! Verification is modeled as an explicit request/decision pair so callers
//! can branch on why a credential check failed rather than just whether it
//! did.

use sha2::Digest;
use sha2::Sha256;

use agentarena_core::model::AgentAccount;
use agentarena_core::model::AgentStatus;

use crate::error::EngineError;
use crate::telemetry::AuthOutcome;
use crate::telemetry::EngineMetrics;

/// Hashes `password` into the prefix-tagged `sha256:<hex>` form stored on
/// [`AgentAccount::password_hash`] and compared against configured admin
/// hashes.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    format!("sha256:{digest:x}")
}

/// Checks `password` against a prefix-tagged stored hash.
///
/// Unrecognized hash prefixes are treated as a verification failure rather
/// than a panic, since a corrupt or future-versioned hash must fail closed.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    stored_hash.starts_with("sha256:") && stored_hash == hash_password(password)
}

/// Outcome of an agent-credential check, carrying enough context for the
/// caller to report the right [`EngineError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAuthDecision {
    /// The account exists, is active, and the password verified.
    Allowed,
    /// The account exists but its status is [`AgentStatus::Locked`].
    Blocked,
    /// The account exists but the password did not verify.
    WrongPassword,
}

/// Verifies an agent credential pair against a loaded [`AgentAccount`].
///
/// Checks status before password: reporting a blocked account ahead of a
/// password mismatch leaks less (an attacker probing a locked account
/// learns nothing about the password).
#[must_use]
pub fn authenticate_agent(account: &AgentAccount, password: &str, metrics: &dyn EngineMetrics) -> AgentAuthDecision {
    if account.status == AgentStatus::Locked {
        metrics.record_auth(AuthOutcome::Denied);
        return AgentAuthDecision::Blocked;
    }
    if !verify_password(password, &account.password_hash) {
        metrics.record_auth(AuthOutcome::Denied);
        return AgentAuthDecision::WrongPassword;
    }
    metrics.record_auth(AuthOutcome::Ok);
    AgentAuthDecision::Allowed
}

impl AgentAuthDecision {
    /// Maps this decision to the [`EngineError`] an aborted batch should
    /// surface.
    #[must_use]
    pub fn into_error(self) -> Option<EngineError> {
        match self {
            Self::Allowed => None,
            Self::Blocked => Some(EngineError::AgentBlocked),
            Self::WrongPassword => Some(EngineError::WrongPassword),
        }
    }
}

/// Verifies an admin password against the configured set of admin hashes.
/// Any one hash matching authorizes the request.
#[must_use]
pub fn authenticate_admin(password: &str, admin_password_hashes: &[String], metrics: &dyn EngineMetrics) -> bool {
    let ok = admin_password_hashes.iter().any(|hash| verify_password(password, hash));
    metrics.record_auth(if ok { AuthOutcome::Ok } else { AuthOutcome::Denied });
    ok
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
    use agentarena_core::identifiers::AgentId;
    use agentarena_core::identifiers::AgentName;
    use agentarena_core::identifiers::EnvSlug;

    fn account(status: AgentStatus, password: &str) -> AgentAccount {
        AgentAccount {
            id: AgentId::new(EnvSlug::parse("nim").unwrap(), AgentName::parse("a").unwrap()),
            password_hash: hash_password(password),
            status,
        }
    }

    #[test]
    fn hash_round_trips_through_verify() {
        let hash = hash_password("correct horse battery staple");
        assert!(hash.starts_with("sha256:"));
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn unrecognized_prefix_fails_closed() {
        assert!(!verify_password("anything", "plaintext:anything"));
    }

    #[test]
    fn active_account_with_correct_password_is_allowed() {
        let acc = account(AgentStatus::Active, "secret");
        assert_eq!(authenticate_agent(&acc, "secret", &NoopMetrics), AgentAuthDecision::Allowed);
    }

    #[test]
    fn locked_account_is_blocked_even_with_correct_password() {
        let acc = account(AgentStatus::Locked, "secret");
        assert_eq!(authenticate_agent(&acc, "secret", &NoopMetrics), AgentAuthDecision::Blocked);
    }

    #[test]
    fn active_account_with_wrong_password_is_denied() {
        let acc = account(AgentStatus::Active, "secret");
        assert_eq!(authenticate_agent(&acc, "nope", &NoopMetrics), AgentAuthDecision::WrongPassword);
    }

    #[test]
    fn admin_auth_accepts_any_configured_hash() {
        let hashes = vec![hash_password("a"), hash_password("b")];
        assert!(authenticate_admin("b", &hashes, &NoopMetrics));
        assert!(!authenticate_admin("c", &hashes, &NoopMetrics));
    }
}
