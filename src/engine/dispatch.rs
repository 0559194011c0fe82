//! Hook dispatch and response routing.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::identifiers::Key;
use crate::protocol::{Message, ResponseKind};

use super::core::Engine;
use super::hooks::{Builtin, Event, HookEntry, HookEvent, HookTarget, run_guarded};
use super::registry::Listener;

// ============================================================================
// Engine - Dispatch
// ============================================================================

impl Engine {
    /// Runs every hook attached to `target`, in order.
    ///
    /// The list is snapshotted first, so hooks added while it runs take
    /// effect from the next event.
    pub(crate) fn fire(&mut self, target: HookTarget, event: &Event<'_>) {
        for entry in self.hooks.entries(target) {
            match entry {
                HookEntry::External(id, hook) => run_guarded(&id, || hook(event)),
                HookEntry::Builtin(builtin) => self.run_builtin(builtin, event),
            }
        }
    }

    fn run_builtin(&mut self, builtin: Builtin, event: &Event<'_>) {
        match (builtin, event) {
            (Builtin::DrainQueue, Event::Open) => self.drain(),
            (Builtin::ReplayUnacknowledged, Event::Open) => self.replay_unacknowledged(),
            (Builtin::Reconnect, Event::Close(_)) => self.schedule_reconnect(),
            (Builtin::Reassemble, Event::Raw(chunk)) => self.reassemble(chunk),
            (Builtin::RouteByKind, Event::Message(message)) => {
                if let Some(kind) = message.kind() {
                    self.fire(HookTarget::Kind(kind), event);
                } else {
                    debug!(tag = message.tag(), "No route for message");
                }
            }
            (Builtin::ClearGate, Event::Message(message)) => self.clear_gate(message),
            (Builtin::RouteParameterValue, Event::Message(message)) => {
                let listeners = self.parameters.matching(|key| message.concerns(key));
                invoke_all(&listeners, message);
            }
            (Builtin::RoutePushedValue, Event::Message(message)) => {
                let listeners = self.push.listeners_for(message);
                invoke_all(&listeners, message);
            }
            (Builtin::RouteParameterMetadata, Event::Message(message)) => {
                let listeners = self
                    .parameter_metadata
                    .take_matching(|key| message.concerns(key));
                invoke_all(&listeners, message);
            }
            (Builtin::RouteGroupValues, Event::Message(message)) => {
                if message.has_group_values() {
                    let listeners = self.groups.matching(|key| message.concerns(key));
                    invoke_all(&listeners, message);
                }
            }
            (Builtin::RouteGroupMetadata, Event::Message(message)) => {
                if message.is(ResponseKind::GroupMetadata) || message.has_group_metadata() {
                    let listeners = self
                        .group_metadata
                        .take_matching(|key| message.concerns(key));
                    invoke_all(&listeners, message);
                }
            }
            (Builtin::ConfirmPush, Event::Message(message)) => self.confirm_push(message),
            (Builtin::ExpandGroupPush, Event::Message(message)) => self.expand_group_push(message),
            (Builtin::RouteLanguages, Event::Message(message)) => {
                let listeners = self.languages.take_all();
                invoke_all(&listeners, message);
            }
            (Builtin::RouteLogFlush, Event::Message(message)) => {
                let listeners = self.log_flush.take_all();
                invoke_all(&listeners, message);
            }
            (builtin, _) => trace!(?builtin, "Built-in hook ignored event"),
        }
    }

    fn reassemble(&mut self, chunk: &str) {
        for message in self.frames.feed(chunk) {
            self.fire(HookEvent::Message.into(), &Event::Message(&message));
        }
    }

    fn clear_gate(&mut self, message: &Message) {
        let Some(kind) = message.kind() else {
            return;
        };
        if self.outbound.acknowledge(kind) {
            trace!(%kind, "Gate cleared");
            self.schedule_drain();
        }
    }

    /// Attaches every group listener of an `MPUSHG` group to the member
    /// parameters it lists.
    fn expand_group_push(&mut self, message: &Message) {
        let listeners = self.groups.matching(|key| message.concerns(key));
        if listeners.is_empty() {
            return;
        }

        let members: Vec<Key> = message
            .values()
            .iter()
            .filter_map(|entry| entry.get("MPUSHP")?.get("MPUSHPID"))
            .filter_map(Key::from_value)
            .collect();

        for key in members {
            for listener in &listeners {
                if !self.parameters.contains(|k| *k == key, listener) {
                    let id = self.ids.listener();
                    self.parameters
                        .register(id, key.clone(), Arc::clone(listener));
                }
            }
        }
        debug!(group = %message.payload(), "Group push members attached");
    }
}

fn invoke_all(listeners: &[Listener], message: &Message) {
    for listener in listeners {
        run_guarded(&message.tag(), || listener(message));
    }
}
