//! Inbound messages.
//!
//! A [`Message`] is one decoded frame. Its kind is taken from the first
//! top-level key once, at decode time; routing code matches on
//! [`Message::kind`] instead of re-inspecting the JSON.
//!
//! # Shapes
//!
//! | Kind | Example |
//! |------|---------|
//! | `MGP` | `{"MGP": {"MGPID": 17, "MGPLabel": "rpm", "ParamVal": "812"}}` |
//! | `MGPM` | `{"MGPM": {"MGPMID": 17, "MGPMName": "rpm", "UnitsStr": "1/min"}}` |
//! | `MGPG` | `{"MGPG": "dash", "Values": [{"MGP": {...}}, ...]}` |
//! | `MGPMG` | `{"MGPMG": "dash", "Values": [{"MGPM": {...}}, ...]}` |
//! | `MPUSHP` | `{"MPUSHP": {"MPUSHPID": "17"}}` |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::Key;

use super::kind::ResponseKind;

// ============================================================================
// Message
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Known kind, or `None` for tags this client does not route.
    kind: Option<ResponseKind>,
    /// First top-level key.
    tag: String,
    /// The whole decoded object.
    body: Map<String, Value>,
}

impl Message {
    /// Decodes one frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the frame is not JSON or not a non-empty
    /// object.
    pub fn decode(frame: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(frame).map_err(|e| Error::decode(e.to_string(), frame))?;

        let Value::Object(body) = value else {
            return Err(Error::decode("frame is not a JSON object", frame));
        };

        let Some(tag) = body.keys().next().cloned() else {
            return Err(Error::decode("frame has no kind tag", frame));
        };

        Ok(Self {
            kind: tag.parse().ok(),
            tag,
            body,
        })
    }

    /// Returns the response kind, if the tag is known.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<ResponseKind> {
        self.kind
    }

    /// Returns `true` if this message is of `kind`.
    #[inline]
    #[must_use]
    pub fn is(&self, kind: ResponseKind) -> bool {
        self.kind == Some(kind)
    }

    /// Returns the kind tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the value stored under the kind tag.
    #[must_use]
    pub fn payload(&self) -> &Value {
        self.body.get(&self.tag).unwrap_or(&Value::Null)
    }

    /// Returns a top-level field other than the tag (e.g. `Values`).
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Returns the whole decoded object.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Returns the `Values` array of group messages.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        self.field("Values")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `key` matches the object this message is about.
    ///
    /// Parameter messages match by numeric id or by name; either is enough.
    /// Group messages (`MGPG`, `MGPMG`, `MPUSHG`) match the group id carried
    /// under the tag.
    #[must_use]
    pub fn concerns(&self, key: &Key) -> bool {
        let payload = self.payload();
        match self.kind {
            Some(ResponseKind::ParameterValue) => {
                key.matches_any(payload.get("MGPID"), payload.get("MGPLabel"))
            }
            Some(ResponseKind::ParameterMetadata) => {
                key.matches_any(payload.get("MGPMID"), payload.get("MGPMName"))
            }
            Some(ResponseKind::PushAck) => key.matches_any(payload.get("MPUSHPID"), None),
            Some(
                ResponseKind::GroupValues
                | ResponseKind::GroupMetadata
                | ResponseKind::GroupPushAck,
            ) => key.matches(payload),
            _ => false,
        }
    }

    /// Returns `true` if the group entries carry values (`MGP`).
    #[must_use]
    pub fn has_group_values(&self) -> bool {
        self.first_value_has("MGP")
    }

    /// Returns `true` if the group entries carry metadata (`MGPM`).
    #[must_use]
    pub fn has_group_metadata(&self) -> bool {
        self.first_value_has("MGPM")
    }

    fn first_value_has(&self, tag: &str) -> bool {
        self.values()
            .first()
            .and_then(|entry| entry.get(tag))
            .is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================
