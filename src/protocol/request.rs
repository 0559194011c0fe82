//! Outbound request messages.
//!
//! A [`Request`] is serialized once, at construction, so the outbound queue
//! and the sent-message ledger hold exactly the text that goes on the wire.
//!
//! # Format
//!
//! ```json
//! {"WPUSHP": {"WPUSHPID": "17", "Minrate": "50", "Maxrate": "100"}}
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::identifiers::Key;

use super::kind::{RequestKind, ResponseKind};

// ============================================================================
// Constants
// ============================================================================

/// Language argument that asks the server for its language list.
const LANGUAGE_QUERY: &str = "-1";

// ============================================================================
// PushRates
// ============================================================================

/// Update rate bounds for a push stream, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRates {
    /// Minimum interval between pushed updates.
    pub min_ms: u64,
    /// Maximum interval between pushed updates.
    pub max_ms: u64,
}

impl PushRates {
    /// Creates rate bounds from milliseconds.
    #[inline]
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

impl Default for PushRates {
    fn default() -> Self {
        Self::new(50, 100)
    }
}

// ============================================================================
// Request
// ============================================================================

/// A serialized request ready for the outbound scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Known kind, or `None` for a custom tag.
    kind: Option<RequestKind>,
    /// Top-level key of the message.
    tag: String,
    /// Serialized JSON text.
    text: String,
}

impl Request {
    /// Builds a request from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `value` is not a non-empty object.
    pub fn from_value(value: &Value) -> Result<Self> {
        let tag = value
            .as_object()
            .and_then(|object| object.keys().next())
            .ok_or_else(|| Error::protocol("request must be a non-empty JSON object"))?
            .clone();

        Ok(Self {
            kind: tag.parse().ok(),
            text: value.to_string(),
            tag,
        })
    }

    /// Parses raw JSON text into a request.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not valid JSON
    /// - [`Error::Protocol`] if it is not a non-empty object
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    fn build(kind: RequestKind, payload: Value) -> Self {
        let mut object = serde_json::Map::with_capacity(1);
        object.insert(kind.tag().to_string(), payload);
        Self {
            kind: Some(kind),
            tag: kind.tag().to_string(),
            text: Value::Object(object).to_string(),
        }
    }

    /// `WGP`: fetch one parameter's current value.
    #[must_use]
    pub fn get_parameter(key: &Key) -> Self {
        Self::build(RequestKind::GetParameter, key.to_value())
    }

    /// `WGPM`: fetch parameter metadata.
    #[must_use]
    pub fn get_parameter_metadata(key: &Key) -> Self {
        Self::build(RequestKind::GetParameterMetadata, key.to_value())
    }

    /// `WGPG`: fetch all values of a group.
    #[must_use]
    pub fn get_group(group: &Key) -> Self {
        Self::build(RequestKind::GetGroup, group.to_value())
    }

    /// `WGPMG`: fetch metadata of a group.
    #[must_use]
    pub fn get_group_metadata(group: &Key) -> Self {
        Self::build(RequestKind::GetGroupMetadata, group.to_value())
    }

    /// `WPUSHP`: register a parameter push stream.
    #[must_use]
    pub fn subscribe_parameter(key: &Key, rates: PushRates) -> Self {
        Self::build(
            RequestKind::SubscribeParameter,
            json!({
                "WPUSHPID": key.to_string(),
                "Minrate": rates.min_ms.to_string(),
                "Maxrate": rates.max_ms.to_string(),
            }),
        )
    }

    /// `WPUSHG`: register a group push stream.
    #[must_use]
    pub fn subscribe_group(group: &Key, rates: PushRates) -> Self {
        Self::build(
            RequestKind::SubscribeGroup,
            json!({
                "WPUSHGID": group.to_string(),
                "Minrate": rates.min_ms.to_string(),
                "Maxrate": rates.max_ms.to_string(),
            }),
        )
    }

    /// `WPUSHC`: cancel all push streams.
    #[must_use]
    pub fn clear_subscriptions() -> Self {
        Self::build(RequestKind::ClearSubscriptions, json!(""))
    }

    /// `WGLAN`: switch the server language.
    #[must_use]
    pub fn set_language(language: &str) -> Self {
        Self::build(RequestKind::SetLanguage, json!(language))
    }

    /// `WGLAN "-1"`: ask for the available languages.
    #[must_use]
    pub fn query_languages() -> Self {
        Self::set_language(LANGUAGE_QUERY)
    }

    /// `WLOG`: force the server to persist its log.
    #[must_use]
    pub fn flush_log() -> Self {
        Self::build(RequestKind::FlushLog, json!("1"))
    }

    /// `WSP`: write a parameter value.
    #[must_use]
    pub fn set_parameter(key: &Key, units: u32, value: impl fmt::Display) -> Self {
        Self::build(
            RequestKind::SetParameter,
            json!({
                "WSPID": key.to_string(),
                "WSPUnits": units,
                "WSPVal": value.to_string(),
            }),
        )
    }

    /// Returns the request kind, if the tag is known.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<RequestKind> {
        self.kind
    }

    /// Returns the top-level tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the response kind this request waits for.
    #[inline]
    #[must_use]
    pub fn expected_response(&self) -> Option<ResponseKind> {
        self.kind.map(RequestKind::response)
    }

    /// Returns the serialized JSON text.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> &str {
        &self.text
    }
}

impl TryFrom<Value> for Request {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(&value)
    }
}

// ============================================================================
// Tests
// ============================================================================
