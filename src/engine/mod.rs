//! Sans-IO protocol engine.
//!
//! The [`Engine`] owns every piece of protocol state for one connection:
//! lifecycle, frame buffer, outbound queue and gate, listener registries,
//! push subscriptions, hooks and timers. It is driven by transport events
//! and timer ticks, and answers with [`Action`]s for a driver to perform.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Engine struct, actions, notifications |
//! | `lifecycle` | Open/close, transport events, timers |
//! | `dispatch` | Hook dispatch and response routing |
//! | `requests` | Outbound scheduling, listeners, request helpers |
//! | `subscriptions` | Push registration, verification, refresh |
//! | `hooks` | Hook table and targets |
//! | `outbound` | Gate, queue, ledger |
//! | `registry` | Listener registries |
//! | `push` | Push subscription table |
//! | `timer` | Clocks and timer queue |
//! | `options` | Tuning options |
//!
//! # Example
//!
//! ```ignore
//! let clock = ManualClock::new();
//! let mut engine = Engine::new(EngineOptions::default()).with_clock(Arc::new(clock.clone()));
//!
//! engine.register_listener(17u32, Arc::new(|message: &Message| {
//!     println!("{}", message.payload());
//! }));
//! engine.open();
//! engine.transport_opened();
//! engine.refresh(17u32);
//!
//! engine.handle_data("{\"MGP\":{\"MGPID\":17,\"ParamVal\":\"812\"}}\n");
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod dispatch;
mod lifecycle;
mod requests;
mod subscriptions;

pub mod hooks;
pub mod options;
pub mod outbound;
pub mod push;
pub mod registry;
pub mod timer;

#[cfg(test)]
mod tests;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Action, CloseInfo, ConnectionState, Engine, Notification, PushSynchronizer};
pub use hooks::{Event, Hook, HookEvent, HookTable, HookTarget};
pub use options::EngineOptions;
pub use push::Confirmation;
pub use registry::Listener;
pub use timer::{Clock, ManualClock, SystemClock, TokioClock};
