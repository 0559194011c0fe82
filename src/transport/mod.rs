//! WebSocket transport layer.
//!
//! Drives an [`Engine`](crate::engine::Engine) over a real WebSocket on a
//! Tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client handles │                              │  VPCA server    │
//! │        │        │         WebSocket            │                 │
//! │   EventLoop     │◄────────────────────────────►│  /VPCA          │
//! │   └─ Engine     │     ws[s]://host/VPCA        │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `ClientBuilder::build` - Validate endpoint and options
//! 2. `ClientConfig::connect` - Spawn the event loop and open
//! 3. `Client` - Register listeners, send requests, subscribe to pushes
//! 4. `Client::close` / `Client::shutdown` - Close without reconnecting
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Endpoint and options configuration |
//! | `connection` | Client handle and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// Endpoint and options configuration.
pub mod builder;

/// Client handle and WebSocket event loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, ClientConfig, DEFAULT_PATH};
pub use connection::Client;
