//! Clocks and scheduled timers.
//!
//! The engine never sleeps. Reconnect backoff, push verification, the
//! post-response send delay and the push refresh debounce are entries in a
//! [`TimerQueue`] keyed by deadline. The driver asks for the next deadline,
//! waits for it, and calls back into the engine; tests use a
//! [`ManualClock`] and advance it by hand.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::identifiers::{SubscriptionId, TimerId};

// ============================================================================
// Clock
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock backed by tokio's time source.
///
/// Follows `tokio::time::pause` / `advance`, so a paused runtime drives the
/// engine's timers deterministically.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    #[inline]
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

// ============================================================================
// TimerKind
// ============================================================================

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Re-open the connection after an unintentional close.
    Reconnect,
    /// Check whether a push registration was confirmed.
    VerifyPush(SubscriptionId),
    /// Transmit the next queued request.
    Drain,
    /// Re-register all push streams.
    RefreshPush,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconnect => f.write_str("reconnect"),
            Self::VerifyPush(id) => write!(f, "verify {id}"),
            Self::Drain => f.write_str("drain"),
            Self::RefreshPush => f.write_str("refresh push"),
        }
    }
}

// ============================================================================
// TimerQueue
// ============================================================================

/// Deadline-ordered timers with cancellation handles.
///
/// Timers with equal deadlines fire in scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    /// Last issued timer id.
    last_id: u64,
    /// Pending timers ordered by deadline, then id.
    pending: BTreeMap<(Instant, TimerId), TimerKind>,
    /// Deadline of each pending timer, for cancellation.
    deadlines: FxHashMap<TimerId, Instant>,
}

impl TimerQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: Instant, kind: TimerKind) -> TimerId {
        self.last_id += 1;
        let id = TimerId::new(self.last_id);
        self.pending.insert((deadline, id), kind);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Cancels a pending timer.
    ///
    /// Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.pending.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Returns `true` if the timer is still pending.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Returns the earliest deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Removes and returns the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, TimerKind)> {
        let entry = self.pending.first_entry()?;
        let (deadline, id) = *entry.key();
        if deadline > now {
            return None;
        }
        let kind = entry.remove();
        self.deadlines.remove(&id);
        Some((id, kind))
    }

    /// Returns the number of pending timers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no timer is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
