//! Connection lifecycle and timers.

use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use super::core::{Action, CloseInfo, ConnectionState, Engine, Notification};
use super::hooks::{Event, HookEvent};
use super::timer::TimerKind;

// ============================================================================
// Engine - Lifecycle
// ============================================================================

impl Engine {
    /// Requests a connection.
    ///
    /// The first call installs the engine's built-in hooks; later calls never
    /// install them again. Emits [`Action::Connect`] only from
    /// [`ConnectionState::Closed`].
    pub fn open(&mut self) {
        if self.hooks.install_builtins() {
            debug!("Built-in hooks installed");
        }
        self.closing_intentionally = false;
        self.start_connect();
    }

    /// Closes the connection without reconnecting.
    ///
    /// Cancels a pending reconnect.
    pub fn close(&mut self) {
        self.closing_intentionally = true;
        let pending = self.reconnect_timer.take();
        self.cancel_timer(pending);

        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => {
                debug!(state = %self.state, "Closing connection");
                self.state = ConnectionState::Closing;
                self.actions.push(Action::Disconnect);
            }
            ConnectionState::Closed | ConnectionState::Closing => {
                trace!(state = %self.state, "Close requested with no transport");
            }
        }
    }

    /// Reports that the transport opened.
    pub fn transport_opened(&mut self) {
        info!(reopen = self.opened_before, "Connection open");
        self.state = ConnectionState::Open;
        self.close_count = 0;
        self.notify(Notification::ConnectionOpened);

        self.fire(HookEvent::Open.into(), &Event::Open);
        self.opened_before = true;
    }

    /// Reports that the transport closed.
    pub fn transport_closed(&mut self, info: CloseInfo) {
        info!(code = ?info.code, reason = %info.reason, "Connection closed");
        self.state = ConnectionState::Closed;
        self.frames.reset();
        self.notify(Notification::ConnectionClosed(info.clone()));

        self.fire(HookEvent::Close.into(), &Event::Close(&info));
    }

    /// Reports a transport error.
    ///
    /// The state does not change; a close report follows.
    pub fn transport_error(&mut self, message: &str) {
        warn!(error = %message, "Transport error");
        self.notify(Notification::ConnectionError(message.to_string()));

        self.fire(HookEvent::Error.into(), &Event::Error(message));
    }

    /// Feeds raw inbound text.
    pub fn handle_data(&mut self, chunk: &str) {
        trace!(len = chunk.len(), "Data received");
        self.fire(HookEvent::RawMessage.into(), &Event::Raw(chunk));
    }

    /// Schedules a reconnect after an unintentional close.
    pub(crate) fn schedule_reconnect(&mut self) {
        if self.closing_intentionally {
            debug!("Intentional close, not reconnecting");
            return;
        }

        if self.close_count >= self.options.max_reconnect_attempts {
            error!(
                attempts = self.close_count,
                "Reconnect attempts exhausted, staying closed"
            );
            self.notify(Notification::ReconnectExhausted {
                attempts: self.close_count,
            });
            return;
        }

        self.close_count += 1;
        let delay = self.options.reconnect_delay;
        let previous = self.reconnect_timer.take();
        self.cancel_timer(previous);
        self.reconnect_timer = Some(self.schedule(delay, TimerKind::Reconnect));

        info!(attempt = self.close_count, ?delay, "Reconnect scheduled");
        self.notify(Notification::Reconnecting {
            attempt: self.close_count,
        });
    }

    fn start_connect(&mut self) {
        if self.state == ConnectionState::Closed {
            debug!("Connecting");
            self.state = ConnectionState::Connecting;
            self.actions.push(Action::Connect);
        } else {
            trace!(state = %self.state, "Connect skipped");
        }
    }
}

// ============================================================================
// Engine - Timers
// ============================================================================

impl Engine {
    /// Returns when [`handle_timers`](Self::handle_timers) next has work.
    #[inline]
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Runs every timer due at the current clock time.
    pub fn handle_timers(&mut self) {
        let now = self.clock.now();
        while let Some((id, kind)) = self.timers.pop_due(now) {
            trace!(%id, %kind, "Timer fired");
            match kind {
                TimerKind::Reconnect => {
                    self.reconnect_timer = None;
                    if !self.closing_intentionally {
                        self.start_connect();
                    }
                }
                TimerKind::VerifyPush(subscription) => self.verify_push(subscription),
                TimerKind::Drain => {
                    self.drain_timer = None;
                    self.drain();
                }
                TimerKind::RefreshPush => {
                    self.refresh_timer = None;
                    self.refresh_push_now();
                }
            }
        }
    }
}
