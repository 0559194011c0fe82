//! Type-safe identifiers.
//!
//! Two kinds of identifiers live here:
//!
//! - [`Key`] names a parameter or group on the server. The server reports
//!   parameters by numeric id and by label, so a key matches either form.
//! - Handle newtypes ([`ListenerId`], [`SubscriptionId`], [`HookId`],
//!   [`TimerId`]) returned by registrations and used to undo them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

// ============================================================================
// Key
// ============================================================================

/// Correlation key for a parameter or group.
///
/// Numeric ids match both JSON numbers and numeric strings (`17` matches
/// `17` and `"17"`). Names match strings exactly, or numbers whose decimal
/// form equals the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Numeric parameter or group id.
    Id(u64),
    /// Parameter label or group name.
    Name(String),
}

impl Key {
    /// Returns `true` if `value` identifies the same object as this key.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Id(id), Value::Number(n)) => n.as_u64() == Some(*id),
            (Self::Id(id), Value::String(s)) => s.trim().parse::<u64>().ok() == Some(*id),
            (Self::Name(name), Value::String(s)) => name == s,
            (Self::Name(name), Value::Number(n)) => *name == n.to_string(),
            _ => false,
        }
    }

    /// Returns `true` if either the id or the name field matches.
    #[must_use]
    pub fn matches_any(&self, id: Option<&Value>, name: Option<&Value>) -> bool {
        id.is_some_and(|v| self.matches(v)) || name.is_some_and(|v| self.matches(v))
    }

    /// Builds a key from an id field as the server reports it.
    ///
    /// Numbers and numeric strings become [`Key::Id`]; other strings become
    /// [`Key::Name`].
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self::Id),
            Value::String(s) => Some(
                s.trim()
                    .parse::<u64>()
                    .map_or_else(|_| Self::Name(s.clone()), Self::Id),
            ),
            _ => None,
        }
    }

    /// JSON form used in request payloads.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Id(id) => Value::from(*id),
            Self::Name(name) => Value::from(name.as_str()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for Key {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<u32> for Key {
    fn from(id: u32) -> Self {
        Self::Id(u64::from(id))
    }
}

impl From<i32> for Key {
    fn from(id: i32) -> Self {
        u64::try_from(id).map_or_else(|_| Self::Name(id.to_string()), Self::Id)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

// ============================================================================
// Handle Newtypes
// ============================================================================

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Returns the raw numeric value.
            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

handle_id!(
    /// Handle for a listener registry entry.
    ListenerId,
    "listener"
);

handle_id!(
    /// Handle for a push subscription.
    SubscriptionId,
    "push"
);

handle_id!(
    /// Handle for a registered hook.
    HookId,
    "hook"
);

handle_id!(
    /// Handle for a scheduled timer.
    TimerId,
    "timer"
);

// ============================================================================
// IdSource
// ============================================================================

/// Monotonic allocator shared by the engine and its client handles.
///
/// Handles are allocated on the caller's side so registration methods can
/// return immediately while the actual registration is applied later by the
/// event loop.
#[derive(Debug)]
pub struct IdSource {
    next: AtomicU64,
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource {
    /// Creates a new allocator starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocates a listener handle.
    pub fn listener(&self) -> ListenerId {
        ListenerId(self.bump())
    }

    /// Allocates a subscription handle.
    pub fn subscription(&self) -> SubscriptionId {
        SubscriptionId(self.bump())
    }

    /// Allocates a hook handle.
    pub fn hook(&self) -> HookId {
        HookId(self.bump())
    }
}

impl TimerId {
    /// Creates a timer id from a counter value.
    #[inline]
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_numeric_key_matches_number_and_string() {
        let key = Key::from(17u32);
        assert!(key.matches(&json!(17)));
        assert!(key.matches(&json!("17")));
        assert!(key.matches(&json!(" 17 ")));
        assert!(!key.matches(&json!(18)));
        assert!(!key.matches(&json!("engine_rpm")));
        assert!(!key.matches(&Value::Null));
    }

    #[test]
    fn test_key_from_reported_value() {
        assert_eq!(Key::from_value(&json!(17)), Some(Key::Id(17)));
        assert_eq!(Key::from_value(&json!("17")), Some(Key::Id(17)));
        assert_eq!(Key::from_value(&json!("rpm")), Some(Key::from("rpm")));
        assert_eq!(Key::from_value(&json!(null)), None);
    }

    #[test]
    fn test_name_key_matches_exact_string() {
        let key = Key::from("engine_rpm");
        assert!(key.matches(&json!("engine_rpm")));
        assert!(!key.matches(&json!("Engine_RPM")));
        assert!(!key.matches(&json!(17)));
    }

    #[test]
    fn test_name_key_matches_numeric_text() {
        let key = Key::from("42");
        assert!(key.matches(&json!(42)));
    }

    #[test]
    fn test_matches_any_accepts_either_field() {
        let key = Key::from("coolant");
        assert!(key.matches_any(Some(&json!(3)), Some(&json!("coolant"))));
        assert!(Key::Id(3).matches_any(Some(&json!(3)), Some(&json!("coolant"))));
        assert!(!key.matches_any(None, None));
    }

    #[test]
    fn test_negative_i32_becomes_name() {
        assert_eq!(Key::from(-1), Key::Name("-1".to_string()));
        assert_eq!(Key::from(5), Key::Id(5));
    }

    #[test]
    fn test_key_to_value() {
        assert_eq!(Key::Id(5).to_value(), json!(5));
        assert_eq!(Key::from("rpm").to_value(), json!("rpm"));
    }

    #[test]
    fn test_id_source_is_monotonic() {
        let ids = IdSource::new();
        let a = ids.listener();
        let b = ids.subscription();
        let c = ids.hook();
        assert!(a.as_u64() < b.as_u64());
        assert!(b.as_u64() < c.as_u64());
        assert_eq!(a.to_string(), format!("listener-{}", a.as_u64()));
    }
}
