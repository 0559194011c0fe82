//! VPCA wire protocol.
//!
//! Every message is a JSON object with one top-level key naming its kind.
//! Inbound messages are newline-delimited; several may arrive in one
//! transport delivery.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` (`W*`) | Client → Server | Fetch, subscribe, write |
//! | `Message` (`M*`) | Server → Client | Response or pushed value |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Newline-delimited reassembly |
//! | `kind` | Request/response kind tags and their correspondence |
//! | `message` | Decoded inbound messages |
//! | `request` | Outbound request builders |

// ============================================================================
// Submodules
// ============================================================================

/// Newline-delimited frame reassembly.
pub mod frame;

/// Request and response kind tags.
pub mod kind;

/// Decoded inbound messages.
pub mod message;

/// Outbound request messages.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::FrameAssembler;
pub use kind::{RequestKind, ResponseKind};
pub use message::Message;
pub use request::{PushRates, Request};
