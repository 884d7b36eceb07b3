// crates/agentarena-core/src/identifiers.rs
// ============================================================================
// Module: Agent Arena Identifiers
// Description: Canonical opaque identifiers for environments, agents and runs.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers for the action-dispatch engine's records. Environment slugs and
//! agent names are validated against the wire patterns at construction time so
//! malformed values never reach the dispatcher; run ids are auto-assigned
//! positive integers with a `Display`/`FromStr` pair that also knows the
//! legacy V0 `"<rid>#<act_no>"` encoding.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// Error returned when a raw string does not satisfy an identifier's pattern.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentifierError {
    /// The environment slug did not match `^[A-Za-z0-9\-.]+$`.
    #[error("invalid environment slug: {0:?}")]
    InvalidEnvSlug(String),
    /// The agent name did not match `^[A-Za-z0-9 \[\]_()\-]+$`.
    #[error("invalid agent name: {0:?}")]
    InvalidAgentName(String),
    /// A V0 `"<rid>#<act_no>"` run reference was malformed.
    #[error("invalid run reference: {0:?}")]
    InvalidRunRef(String),
    /// A raw run id was not positive.
    #[error("run id must be positive, got {0}")]
    InvalidRunId(i64),
}

/// Whether `c` is allowed in an [`EnvSlug`].
fn is_env_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.'
}

/// Whether `c` is allowed in an [`AgentName`].
fn is_agent_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '[' | ']' | '_' | '(' | ')' | '-')
}

/// Environment slug, e.g. `nim`.
///
/// # Invariants
/// - Non-empty and matches `^[A-Za-z0-9\-.]+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvSlug(String);

impl EnvSlug {
    /// Validates and wraps a raw slug.
    ///
    /// # Errors
    /// Returns [`IdentifierError::InvalidEnvSlug`] if `raw` is empty or
    /// contains a character outside `[A-Za-z0-9-.]`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdentifierError> {
        let raw = raw.into();
        if raw.is_empty() || !raw.chars().all(is_env_slug_char) {
            return Err(IdentifierError::InvalidEnvSlug(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for EnvSlug {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EnvSlug> for String {
    fn from(value: EnvSlug) -> Self {
        value.0
    }
}

/// Agent display name, unique within an environment.
///
/// # Invariants
/// - Non-empty and matches `^[A-Za-z0-9 \[\]_()\-]+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentName(String);

impl AgentName {
    /// Validates and wraps a raw agent name.
    ///
    /// # Errors
    /// Returns [`IdentifierError::InvalidAgentName`] if `raw` is empty or
    /// contains a character outside the agent-name alphabet.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdentifierError> {
        let raw = raw.into();
        if raw.is_empty() || !raw.chars().all(is_agent_name_char) {
            return Err(IdentifierError::InvalidAgentName(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for AgentName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AgentName> for String {
    fn from(value: AgentName) -> Self {
        value.0
    }
}

/// Composite identifier for an agent account, `<env-slug>/<agent-name>`.
///
/// # Invariants
/// - Both components are independently validated `EnvSlug`/`AgentName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId {
    /// Owning environment.
    env: EnvSlug,
    /// Bare agent name within that environment.
    name: AgentName,
}

impl AgentId {
    /// Builds an agent identifier from its validated components.
    #[must_use]
    pub const fn new(env: EnvSlug, name: AgentName) -> Self {
        Self { env, name }
    }

    /// Returns the owning environment slug.
    #[must_use]
    pub const fn env(&self) -> &EnvSlug {
        &self.env
    }

    /// Returns the bare agent name (without the environment prefix).
    #[must_use]
    pub const fn name(&self) -> &AgentName {
        &self.name
    }

    /// Returns the store-level identifier `<env-slug>/<agent-name>`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}/{}", self.env, self.name)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.env, self.name)
    }
}

/// Auto-assigned, positive run identifier.
///
/// # Invariants
/// - Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(i64);

impl RunId {
    /// Wraps a raw store-assigned run id.
    ///
    /// # Panics
    /// Panics if `raw` is not positive; store-assigned ids are always `>= 1`.
    /// Only call this on a value the store itself produced. For a value
    /// originating outside this process (CLI arguments, wire input), use
    /// [`RunId::try_new`] instead.
    #[must_use]
    pub fn new(raw: i64) -> Self {
        assert!(raw > 0, "run id must be positive, got {raw}");
        Self(raw)
    }

    /// Validates and wraps a raw run id from an untrusted source.
    ///
    /// # Errors
    /// Returns [`IdentifierError::InvalidRunId`] if `raw` is not positive.
    pub fn try_new(raw: i64) -> Result<Self, IdentifierError> {
        if raw <= 0 {
            return Err(IdentifierError::InvalidRunId(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the raw run id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A run id paired with the act number observed when it was issued, the V0
/// wire encoding of a run reference (`"<rid>#<act_no>"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRef {
    /// The referenced run.
    pub run: RunId,
    /// The action number expected by the client issuing this reference.
    pub act_no: u32,
}

impl fmt::Display for RunRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.run, self.act_no)
    }
}

impl FromStr for RunRef {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rid, act_no) = s
            .split_once('#')
            .ok_or_else(|| IdentifierError::InvalidRunRef(s.to_owned()))?;
        let rid: i64 = rid
            .parse()
            .map_err(|_| IdentifierError::InvalidRunRef(s.to_owned()))?;
        let act_no: u32 = act_no
            .parse()
            .map_err(|_| IdentifierError::InvalidRunRef(s.to_owned()))?;
        if rid <= 0 {
            return Err(IdentifierError::InvalidRunRef(s.to_owned()));
        }
        Ok(Self { run: RunId::new(rid), act_no })
    }
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
    fn env_slug_rejects_bad_chars() {
        assert!(EnvSlug::parse("nim").is_ok());
        assert!(EnvSlug::parse("nim_env").is_err());
        assert!(EnvSlug::parse("").is_err());
    }

    #[test]
    fn agent_name_allows_brackets_and_spaces() {
        assert!(AgentName::parse("agent [v2] (beta)").is_ok());
        assert!(AgentName::parse("agent/evil").is_err());
    }

    #[test]
    fn run_id_try_new_rejects_nonpositive_values() {
        assert!(RunId::try_new(1).is_ok());
        assert!(RunId::try_new(0).is_err());
        assert!(RunId::try_new(-5).is_err());
    }

    #[test]
    fn run_ref_round_trips() {
        let r = RunRef { run: RunId::new(42), act_no: 3 };
        let rendered = r.to_string();
        assert_eq!(rendered, "42#3");
        let parsed: RunRef = rendered.parse().expect("should parse");
        assert_eq!(parsed, r);
    }

    #[test]
    fn run_ref_rejects_malformed_input() {
        assert!("42".parse::<RunRef>().is_err());
        assert!("-1#3".parse::<RunRef>().is_err());
        assert!("abc#3".parse::<RunRef>().is_err());
    }
}
