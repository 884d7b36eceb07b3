// crates/agentarena-engine/src/lib.rs
// ============================================================================
// Crate: agentarena-engine
// Description: Action-dispatch and run-lifecycle engine.
// Purpose: Tie authentication, error taxonomy, telemetry, the dispatcher and
//          administrative operations into one crate an embedding transport
//          (CLI, HTTP server) can drive without touching storage directly.
// Dependencies: agentarena-core, agentarena-contract, agentarena-registry,
//               agentarena-store-sqlite, rand, sha2, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ActManager`] is the crate's single entry point for processing a batch
//! request; [`admin`] covers the operations an administrator performs
//! outside of normal play (account/environment provisioning, results
//! snapshots, housekeeping). [`testing`] holds a deliberately small
//! environment capability used only by this crate's own integration tests.

pub mod admin;
pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod error_buffer;
pub mod telemetry;

#[doc(hidden)]
pub mod testing;

pub use admin::AgentResult;
pub use admin::CreatedAgent;
pub use auth::AgentAuthDecision;
pub use dispatcher::ActManager;
pub use error::EngineError;
pub use error::StatusHint;
pub use error_buffer::ErrorBuffer;
pub use telemetry::ActionOutcome;
pub use telemetry::AuthOutcome;
pub use telemetry::EngineMetrics;
pub use telemetry::NoopMetrics;
