//! Hook table.
//!
//! Hooks are callbacks attached to a lifecycle event or to a response kind.
//! The engine's own behaviour (draining the queue on open, reconnecting on
//! close, reassembling frames, routing responses) is installed into the same
//! lists as [`Builtin`] entries the first time the connection opens, so user
//! hooks and built-in handlers run in one well-defined order.
//!
//! # Hook Names
//!
//! | Name | Target |
//! |------|--------|
//! | `open`, `onOpen` | transport opened |
//! | `close`, `onClose` | transport closed |
//! | `error`, `onError` | transport error |
//! | `message`, `onMessage` | raw inbound text |
//! | `decoded`, `onValidJSON` | every decoded message |
//! | `MGP`, `MGPM`, ... | decoded messages of that kind |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::identifiers::HookId;
use crate::protocol::{Message, ResponseKind};

use super::CloseInfo;

// ============================================================================
// HookEvent / HookTarget
// ============================================================================

/// Lifecycle events a hook can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// The transport opened.
    Open,
    /// The transport closed.
    Close,
    /// The transport reported an error.
    Error,
    /// Raw text arrived, before reassembly.
    RawMessage,
    /// A frame decoded into a message.
    Message,
}

impl HookEvent {
    /// All lifecycle events.
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::Close,
        Self::Error,
        Self::RawMessage,
        Self::Message,
    ];
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Error => "error",
            Self::RawMessage => "message",
            Self::Message => "decoded",
        })
    }
}

/// Where a hook is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookTarget {
    /// A lifecycle event.
    Lifecycle(HookEvent),
    /// Decoded messages of one kind.
    Kind(ResponseKind),
}

impl From<HookEvent> for HookTarget {
    fn from(event: HookEvent) -> Self {
        Self::Lifecycle(event)
    }
}

impl From<ResponseKind> for HookTarget {
    fn from(kind: ResponseKind) -> Self {
        Self::Kind(kind)
    }
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifecycle(event) => event.fmt(f),
            Self::Kind(kind) => kind.fmt(f),
        }
    }
}

impl FromStr for HookTarget {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let event = match name {
            "open" | "onOpen" => HookEvent::Open,
            "close" | "onClose" => HookEvent::Close,
            "error" | "onError" => HookEvent::Error,
            "message" | "onMessage" => HookEvent::RawMessage,
            "decoded" | "onValidJSON" => HookEvent::Message,
            other => {
                return other
                    .parse::<ResponseKind>()
                    .map(Self::Kind)
                    .map_err(|_| Error::unknown_hook(other));
            }
        };
        Ok(Self::Lifecycle(event))
    }
}

// ============================================================================
// Event / Hook
// ============================================================================

/// Payload passed to a hook.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// The transport opened.
    Open,
    /// The transport closed.
    Close(&'a CloseInfo),
    /// The transport reported an error.
    Error(&'a str),
    /// Raw inbound text.
    Raw(&'a str),
    /// A decoded message.
    Message(&'a Message),
}

/// User hook callback.
pub type Hook = Arc<dyn Fn(&Event<'_>) + Send + Sync>;

// ============================================================================
// Builtin
// ============================================================================

/// Engine handlers installed into the hook table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    /// Open: resend the last request if its response never came. Runs
    /// before the drain so only the previous transport's request is resent.
    ReplayUnacknowledged,
    /// Open: transmit queued requests.
    DrainQueue,
    /// Close: schedule a reconnect.
    Reconnect,
    /// Raw text: split into frames and dispatch decoded messages.
    Reassemble,
    /// Decoded: dispatch to the hooks of the message kind.
    RouteByKind,
    /// Decoded: clear the gate when the awaited response arrives.
    ClearGate,
    /// `MGP`: parameter listeners.
    RouteParameterValue,
    /// `MGP`: push subscription listeners.
    RoutePushedValue,
    /// `MGPM`: one-shot parameter metadata listeners.
    RouteParameterMetadata,
    /// `MGPG` with values: group listeners.
    RouteGroupValues,
    /// `MGPMG`, or `MGPG` with metadata: one-shot group metadata listeners.
    RouteGroupMetadata,
    /// `MPUSHP`: confirm push subscriptions.
    ConfirmPush,
    /// `MPUSHG`: attach group listeners to the member parameters.
    ExpandGroupPush,
    /// `MGLAN`: one-shot language listeners.
    RouteLanguages,
    /// `MLOG`: one-shot log flush listeners.
    RouteLogFlush,
}

impl Builtin {
    fn defaults() -> Vec<(HookTarget, Self)> {
        use HookEvent as E;
        use ResponseKind as K;

        vec![
            (E::Open.into(), Self::ReplayUnacknowledged),
            (E::Open.into(), Self::DrainQueue),
            (E::Close.into(), Self::Reconnect),
            (E::RawMessage.into(), Self::Reassemble),
            (E::Message.into(), Self::RouteByKind),
            (E::Message.into(), Self::ClearGate),
            (K::ParameterValue.into(), Self::RouteParameterValue),
            (K::ParameterValue.into(), Self::RoutePushedValue),
            (K::ParameterMetadata.into(), Self::RouteParameterMetadata),
            (K::GroupValues.into(), Self::RouteGroupValues),
            (K::GroupValues.into(), Self::RouteGroupMetadata),
            (K::GroupMetadata.into(), Self::RouteGroupMetadata),
            (K::PushAck.into(), Self::ConfirmPush),
            (K::GroupPushAck.into(), Self::ExpandGroupPush),
            (K::LanguageList.into(), Self::RouteLanguages),
            (K::LogAck.into(), Self::RouteLogFlush),
        ]
    }
}

/// One entry of a hook list.
#[derive(Clone)]
pub(crate) enum HookEntry {
    Builtin(Builtin),
    External(HookId, Hook),
}

impl fmt::Debug for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
            Self::External(id, _) => f.debug_tuple("External").field(id).finish(),
        }
    }
}

// ============================================================================
// HookTable
// ============================================================================

/// Hook lists per target.
#[derive(Debug, Default)]
pub struct HookTable {
    lists: FxHashMap<HookTarget, Vec<HookEntry>>,
    builtins_installed: bool,
}

impl HookTable {
    /// Appends a user hook.
    pub fn add(&mut self, target: HookTarget, id: HookId, hook: Hook) {
        debug!(%target, %id, "Hook added");
        self.lists
            .entry(target)
            .or_default()
            .push(HookEntry::External(id, hook));
    }

    /// Removes a user hook.
    pub fn remove(&mut self, id: HookId) -> bool {
        let mut removed = false;
        for list in self.lists.values_mut() {
            list.retain(|entry| {
                let matches = matches!(entry, HookEntry::External(hook_id, _) if *hook_id == id);
                removed |= matches;
                !matches
            });
        }
        removed
    }

    /// Installs the engine handlers once.
    ///
    /// Returns `false` if they were already installed.
    pub(crate) fn install_builtins(&mut self) -> bool {
        if self.builtins_installed {
            return false;
        }
        for (target, builtin) in Builtin::defaults() {
            self.lists
                .entry(target)
                .or_default()
                .push(HookEntry::Builtin(builtin));
        }
        self.builtins_installed = true;
        true
    }

    /// Returns `true` once the engine handlers are installed.
    #[inline]
    #[must_use]
    pub fn builtins_installed(&self) -> bool {
        self.builtins_installed
    }

    /// Returns a snapshot of the list for `target`.
    pub(crate) fn entries(&self, target: HookTarget) -> Vec<HookEntry> {
        self.lists.get(&target).cloned().unwrap_or_default()
    }

    /// Returns the number of user hooks attached to `target`.
    #[must_use]
    pub fn user_hooks(&self, target: HookTarget) -> usize {
        self.lists.get(&target).map_or(0, |list| {
            list.iter()
                .filter(|entry| matches!(entry, HookEntry::External(..)))
                .count()
        })
    }
}

// ============================================================================
// Callback Isolation
// ============================================================================

/// Runs a user callback, logging instead of unwinding if it panics.
pub(crate) fn run_guarded(context: &dyn fmt::Display, callback: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(callback)) {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(%context, %reason, "Callback panicked");
    }
}

// ============================================================================
// Tests
// ============================================================================
