//! VPCA client - protocol engine for the VPCA vehicle parameter service.
//!
//! A VPCA server exposes vehicle parameters (and groups of them) over a
//! WebSocket at `/VPCA`. This library keeps one connection alive, funnels
//! every request through a single-flight scheduler, routes responses and
//! pushed values to registered listeners, and keeps push subscriptions
//! confirmed.
//!
//! # Architecture
//!
//! - **[`Engine`]** (sans-IO): all protocol state. Fed transport events,
//!   inbound text and timer ticks; answers with [`Action`]s.
//! - **[`Client`]** (Tokio): a cloneable handle to an event loop that owns
//!   the engine and the WebSocket and performs its actions.
//!
//! Key design principles:
//!
//! - At most one request awaits its response at any time
//! - Listeners are keyed by parameter id or name; either form matches
//! - Unintentional closes reconnect, up to a bound
//! - A panicking callback is logged and never stops dispatch
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use vpca_client::{Client, Message, PushRates, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder().host("192.168.4.1").connect()?;
//!     client.wait_open(Duration::from_secs(5)).await?;
//!
//!     // Current value once, then a push stream
//!     client.register_listener(17u32, Arc::new(|message: &Message| {
//!         println!("speed: {}", message.payload());
//!     }))?;
//!     client.refresh(17u32)?;
//!     client.request_push(17u32, PushRates::new(100, 500), Arc::new(|message: &Message| {
//!         println!("pushed: {}", message.payload());
//!     }))?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     client.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`engine`] | Sans-IO protocol engine |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Parameter keys and handle newtypes |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | WebSocket client and event loop |

// ============================================================================
// Modules
// ============================================================================

/// Sans-IO protocol engine.
///
/// Use [`Engine`] directly to drive the protocol over any transport.
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Parameter keys and registration handles.
pub mod identifiers;

/// VPCA wire protocol: requests, messages, frame reassembly.
pub mod protocol;

/// WebSocket transport layer.
///
/// [`Client`] and its builder.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use engine::{
    Action, CloseInfo, ConnectionState, Engine, EngineOptions, Event, Hook, HookEvent, HookTarget,
    Listener, Notification, PushSynchronizer,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{HookId, Key, ListenerId, SubscriptionId};

// Protocol types
pub use protocol::{Message, PushRates, Request, RequestKind, ResponseKind};

// Transport types
pub use transport::{Client, ClientBuilder, ClientConfig};
