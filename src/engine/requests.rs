//! Outbound scheduling, listener registration and request helpers.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::{HookId, Key, ListenerId};
use crate::protocol::Request;

use super::core::{Action, ConnectionState, Engine};
use super::hooks::{Hook, HookTarget};
use super::registry::Listener;
use super::timer::TimerKind;

// ============================================================================
// Engine - Outbound
// ============================================================================

impl Engine {
    /// Sends a request, or queues it until the connection is open and no
    /// other response is awaited.
    ///
    /// Never fails: a request that cannot go out now waits in the queue.
    pub fn send(&mut self, request: Request) {
        if self.is_open() && self.outbound.is_clear() && self.outbound.queue.is_empty() {
            self.transmit(request);
            return;
        }

        trace!(
            kind = request.tag(),
            gate = ?self.outbound.gate(),
            state = %self.state,
            "Request queued"
        );
        self.outbound.queue.push(request);

        if self.is_open() && self.outbound.is_clear() {
            self.schedule_drain();
        }
    }

    /// Parses raw JSON and sends it.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not a JSON object; nothing is queued.
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        let request = Request::parse(text)?;
        self.send(request);
        Ok(())
    }

    /// Transmits queued requests while the gate stays clear.
    pub(crate) fn drain(&mut self) {
        while self.state == ConnectionState::Open && self.outbound.is_clear() {
            let Some(request) = self.outbound.queue.next() else {
                break;
            };
            self.transmit(request);
        }
    }

    /// Schedules a drain after the send delay, unless one is pending.
    pub(crate) fn schedule_drain(&mut self) {
        if self.drain_timer.is_some() || self.outbound.queue.is_empty() {
            return;
        }
        let delay = self.options.send_delay;
        self.drain_timer = Some(self.schedule(delay, TimerKind::Drain));
    }

    /// Resends the last request if its response is still awaited after a
    /// reconnect.
    pub(crate) fn replay_unacknowledged(&mut self) {
        if !self.opened_before {
            return;
        }
        if let Some(request) = self.outbound.unacknowledged().cloned() {
            debug!(kind = request.tag(), "Replaying unacknowledged request");
            self.transmit(request);
        }
    }

    fn transmit(&mut self, request: Request) {
        debug!(kind = request.tag(), "Transmitting");
        self.outbound.record_sent(&request);
        self.actions.push(Action::Transmit(request.as_text().to_string()));
    }
}

// ============================================================================
// Engine - Hooks
// ============================================================================

impl Engine {
    /// Attaches a hook.
    pub fn add_hook(&mut self, target: HookTarget, hook: Hook) -> HookId {
        let id = self.ids.hook();
        self.attach_hook(id, target, hook);
        id
    }

    /// Attaches a hook by name (`"onOpen"`, `"MGP"`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHook`](crate::Error::UnknownHook) for a name
    /// that is neither a lifecycle event nor a response kind; nothing is
    /// attached.
    pub fn add_named_hook(&mut self, name: &str, hook: Hook) -> Result<HookId> {
        match name.parse::<HookTarget>() {
            Ok(target) => Ok(self.add_hook(target, hook)),
            Err(e) => {
                warn!(name, "Rejected hook for unknown event");
                Err(e)
            }
        }
    }

    /// Detaches a hook.
    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }

    pub(crate) fn attach_hook(&mut self, id: HookId, target: HookTarget, hook: Hook) {
        self.hooks.add(target, id, hook);
    }
}

// ============================================================================
// Engine - Listeners
// ============================================================================

impl Engine {
    /// Registers a persistent listener for parameter values (`MGP`).
    pub fn register_listener(&mut self, key: impl Into<Key>, listener: Listener) -> ListenerId {
        let id = self.ids.listener();
        self.attach_listener(id, key.into(), listener);
        id
    }

    /// Removes parameter listeners registered under `key` with the same
    /// `listener`.
    pub fn deregister_listener(&mut self, key: &Key, listener: &Listener) -> usize {
        self.parameters.remove_matching(|k| k == key, listener)
    }

    /// Registers a persistent listener for group values (`MGPG`).
    pub fn register_group_listener(
        &mut self,
        group: impl Into<Key>,
        listener: Listener,
    ) -> ListenerId {
        let id = self.ids.listener();
        self.attach_group_listener(id, group.into(), listener);
        id
    }

    /// Removes group listeners registered under `group` with the same
    /// `listener`.
    pub fn deregister_group_listener(&mut self, group: &Key, listener: &Listener) -> usize {
        self.groups.remove_matching(|k| k == group, listener)
    }

    /// Removes a listener of any kind by handle.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.parameters.remove(id)
            || self.groups.remove(id)
            || self.parameter_metadata.remove(id)
            || self.group_metadata.remove(id)
            || self.languages.remove(id)
            || self.log_flush.remove(id)
            || self.remove_push_synchronizer(id)
    }

    pub(crate) fn attach_listener(&mut self, id: ListenerId, key: Key, listener: Listener) {
        debug!(%id, %key, "Parameter listener registered");
        self.parameters.register(id, key, listener);
    }

    pub(crate) fn attach_group_listener(&mut self, id: ListenerId, group: Key, listener: Listener) {
        debug!(%id, %group, "Group listener registered");
        self.groups.register(id, group, listener);
    }
}

// ============================================================================
// Engine - Requests
// ============================================================================

impl Engine {
    /// Re-fetches a parameter value (`WGP`).
    pub fn refresh(&mut self, key: impl Into<Key>) {
        self.send(Request::get_parameter(&key.into()));
    }

    /// Fetches all values of a group (`WGPG`).
    pub fn request_group(&mut self, group: impl Into<Key>) {
        self.send(Request::get_group(&group.into()));
    }

    /// Fetches parameter metadata (`WGPM`); `listener` fires once.
    pub fn request_metadata(&mut self, key: impl Into<Key>, listener: Listener) -> ListenerId {
        let id = self.ids.listener();
        self.attach_metadata_request(id, key.into(), listener);
        id
    }

    /// Fetches group metadata (`WGPMG`); `listener` fires once.
    pub fn request_group_metadata(
        &mut self,
        group: impl Into<Key>,
        listener: Listener,
    ) -> ListenerId {
        let id = self.ids.listener();
        self.attach_group_metadata_request(id, group.into(), listener);
        id
    }

    /// Writes a parameter value (`WSP`).
    pub fn set_parameter(&mut self, key: impl Into<Key>, units: u32, value: impl fmt::Display) {
        self.send(Request::set_parameter(&key.into(), units, value));
    }

    /// Switches the server language (`WGLAN`).
    pub fn set_language(&mut self, language: &str) {
        self.send(Request::set_language(language));
    }

    /// Asks for the available languages; `listener` fires once with `MGLAN`.
    pub fn request_languages(&mut self, listener: Listener) -> ListenerId {
        let id = self.ids.listener();
        self.attach_language_request(id, listener);
        id
    }

    /// Asks the server to persist its log (`WLOG`).
    ///
    /// `listener`, if given, fires once with `MLOG`.
    pub fn flush_log(&mut self, listener: Option<Listener>) -> Option<ListenerId> {
        let waiter = listener.map(|listener| (self.ids.listener(), listener));
        let id = waiter.as_ref().map(|(id, _)| *id);
        self.attach_log_flush(waiter);
        id
    }

    pub(crate) fn attach_metadata_request(&mut self, id: ListenerId, key: Key, listener: Listener) {
        let request = Request::get_parameter_metadata(&key);
        self.parameter_metadata.register(id, key, listener);
        self.send(request);
    }

    pub(crate) fn attach_group_metadata_request(
        &mut self,
        id: ListenerId,
        group: Key,
        listener: Listener,
    ) {
        let request = Request::get_group_metadata(&group);
        self.group_metadata.register(id, group, listener);
        self.send(request);
    }

    pub(crate) fn attach_language_request(&mut self, id: ListenerId, listener: Listener) {
        self.languages.register(id, (), listener);
        self.send(Request::query_languages());
    }

    pub(crate) fn attach_log_flush(&mut self, waiter: Option<(ListenerId, Listener)>) {
        if let Some((id, listener)) = waiter {
            self.log_flush.register(id, (), listener);
        }
        self.send(Request::flush_log());
    }
}
