//! Engine state and shared types.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::identifiers::{IdSource, Key, ListenerId, SubscriptionId, TimerId};
use crate::protocol::{FrameAssembler, Request, ResponseKind};

use super::hooks::HookTable;
use super::options::EngineOptions;
use super::outbound::Outbound;
use super::push::PushTable;
use super::registry::Registry;
use super::timer::{Clock, SystemClock, TimerKind, TimerQueue};

// ============================================================================
// ConnectionState
// ============================================================================

/// Transport state as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport.
    #[default]
    Closed,
    /// A connect was requested and has not completed.
    Connecting,
    /// The transport is open.
    Open,
    /// A disconnect was requested and has not completed.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        })
    }
}

// ============================================================================
// CloseInfo
// ============================================================================

/// Details of a transport close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code, if one was received.
    pub code: Option<u16>,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Creates close details.
    #[must_use]
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Action
// ============================================================================

/// I/O the driver must perform on the engine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the transport.
    Connect,
    /// Write one text message.
    Transmit(String),
    /// Close the transport.
    Disconnect,
}

// ============================================================================
// Notification
// ============================================================================

/// User-visible conditions reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The transport opened.
    ConnectionOpened,
    /// The transport closed.
    ConnectionClosed(CloseInfo),
    /// The transport reported an error.
    ConnectionError(String),
    /// A reconnect was scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// Reconnect attempts ran out; the connection stays closed.
    ReconnectExhausted {
        /// Attempts made.
        attempts: u32,
    },
    /// A push subscription was never confirmed and was dropped.
    PushFailed {
        /// Dropped subscription.
        subscription: SubscriptionId,
        /// Parameter it was for.
        key: Key,
    },
}

// ============================================================================
// Types
// ============================================================================

/// Callback invoked after push streams are re-registered.
pub type PushSynchronizer = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Engine
// ============================================================================

/// Sans-IO protocol engine for one VPCA connection.
///
/// The engine never performs I/O. Feed it transport events and timer
/// ticks; collect the [`Action`]s it emits with
/// [`take_actions`](Self::take_actions).
///
/// # Example
///
/// ```ignore
/// let mut engine = Engine::new(EngineOptions::default());
/// engine.open();
/// assert_eq!(engine.take_actions(), vec![Action::Connect]);
///
/// engine.transport_opened();
/// engine.refresh(Key::Id(17));
/// // -> Action::Transmit("{\"WGP\":17}")
/// ```
pub struct Engine {
    pub(crate) options: EngineOptions,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<IdSource>,

    // Connection
    pub(crate) state: ConnectionState,
    pub(crate) close_count: u32,
    pub(crate) closing_intentionally: bool,
    pub(crate) opened_before: bool,

    pub(crate) frames: FrameAssembler,
    pub(crate) outbound: Outbound,
    pub(crate) hooks: HookTable,

    // Listener registries
    pub(crate) parameters: Registry<Key>,
    pub(crate) groups: Registry<Key>,
    pub(crate) parameter_metadata: Registry<Key>,
    pub(crate) group_metadata: Registry<Key>,
    pub(crate) languages: Registry<()>,
    pub(crate) log_flush: Registry<()>,

    pub(crate) push: PushTable,
    pub(crate) synchronizers: Vec<(ListenerId, PushSynchronizer)>,

    // Timers
    pub(crate) timers: TimerQueue,
    pub(crate) reconnect_timer: Option<TimerId>,
    pub(crate) drain_timer: Option<TimerId>,
    pub(crate) refresh_timer: Option<TimerId>,

    pub(crate) actions: Vec<Action>,
    pub(crate) notifications: Vec<Notification>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("close_count", &self.close_count)
            .field("gate", &self.outbound.gate())
            .field("queued", &self.outbound.queue.unread())
            .field("subscriptions", &self.push.len())
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Engine {
    /// Creates an engine using the system clock.
    #[must_use]
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            clock: Arc::new(SystemClock),
            ids: Arc::new(IdSource::new()),
            state: ConnectionState::Closed,
            close_count: 0,
            closing_intentionally: false,
            opened_before: false,
            frames: FrameAssembler::new(),
            outbound: Outbound::default(),
            hooks: HookTable::default(),
            parameters: Registry::default(),
            groups: Registry::default(),
            parameter_metadata: Registry::default(),
            group_metadata: Registry::default(),
            languages: Registry::default(),
            log_flush: Registry::default(),
            push: PushTable::default(),
            synchronizers: Vec::new(),
            timers: TimerQueue::new(),
            reconnect_timer: None,
            drain_timer: None,
            refresh_timer: None,
            actions: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shares a handle allocator with client handles.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<IdSource>) -> Self {
        self.ids = ids;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Engine {
    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` if the transport is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Returns the number of consecutive unintentional closes.
    #[inline]
    #[must_use]
    pub fn close_count(&self) -> u32 {
        self.close_count
    }

    /// Returns the options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns the response kind currently awaited.
    #[inline]
    #[must_use]
    pub fn awaiting(&self) -> Option<ResponseKind> {
        self.outbound.gate()
    }

    /// Returns the queued requests in transmission order.
    pub fn queued(&self) -> impl Iterator<Item = &Request> {
        self.outbound.queue.iter()
    }

    /// Returns the last transmitted request.
    #[inline]
    #[must_use]
    pub fn last_sent(&self) -> Option<&Request> {
        self.outbound.last_sent()
    }

    /// Returns the number of tracked push subscriptions.
    #[inline]
    #[must_use]
    pub fn push_subscriptions(&self) -> usize {
        self.push.len()
    }

    /// Returns the hook table.
    #[inline]
    #[must_use]
    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    /// Returns the number of frames dropped because they failed to decode.
    #[inline]
    #[must_use]
    pub fn decode_failures(&self) -> u64 {
        self.frames.decode_failures()
    }

    /// Takes the actions emitted since the last call.
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    /// Takes the notifications emitted since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

// ============================================================================
// Internal Helpers
// ============================================================================

impl Engine {
    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub(crate) fn schedule(&mut self, delay: std::time::Duration, kind: TimerKind) -> TimerId {
        let deadline: Instant = self.clock.now() + delay;
        self.timers.schedule(deadline, kind)
    }

    pub(crate) fn cancel_timer(&mut self, timer: Option<TimerId>) {
        if let Some(id) = timer {
            self.timers.cancel(id);
        }
    }
}
