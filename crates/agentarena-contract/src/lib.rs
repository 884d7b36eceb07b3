// crates/agentarena-contract/src/lib.rs
// ============================================================================
// Crate: agentarena-contract
// Description: Wire protocol types for the action-dispatch engine.
// Purpose: Give an embedding transport layer (out of scope for this crate)
//          total, lossless conversions between the legacy V0 wire shape and
//          the canonical V1 shape the dispatcher operates on.
// ============================================================================

//! ## Overview
//! Two request/response pairs ([`v0`], [`v1`]) plus the [`convert`] module's
//! total V0→V1 and best-effort V1→V0 conversions. The dispatcher
//! (`agentarena-engine`) only ever sees [`v1::RequestV1`]/[`v1::ResponseV1`].

/// Conversions between the V0 and V1 wire shapes.
pub mod convert;
/// Shared message envelope types.
pub mod message;
/// Legacy V0 wire protocol types.
pub mod v0;
/// Canonical V1 wire protocol types.
pub mod v1;

pub use convert::ProtocolError;
pub use convert::VersionedRequest;
pub use message::Message;
pub use message::MessageType;
pub use v0::RequestV0;
pub use v0::ResponseV0;
pub use v1::RequestV1;
pub use v1::ResponseV1;
