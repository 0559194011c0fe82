//! Request and response kind tags.
//!
//! Every frame is a JSON object whose first key is its kind tag. Requests
//! are `W*` tags, responses are `M*` tags. Each request kind maps to the
//! response kind the server answers it with, which is what the outstanding
//! request gate waits for.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// RequestKind
// ============================================================================

/// Kinds of requests sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Fetch one parameter's current value.
    #[serde(rename = "WGP")]
    GetParameter,
    /// Fetch name, units, min and max of a parameter.
    #[serde(rename = "WGPM")]
    GetParameterMetadata,
    /// Fetch all values in a group.
    #[serde(rename = "WGPG")]
    GetGroup,
    /// Fetch metadata for every parameter in a group.
    #[serde(rename = "WGPMG")]
    GetGroupMetadata,
    /// Register a parameter push stream.
    #[serde(rename = "WPUSHP")]
    SubscribeParameter,
    /// Register a group push stream.
    #[serde(rename = "WPUSHG")]
    SubscribeGroup,
    /// Cancel all push streams.
    #[serde(rename = "WPUSHC")]
    ClearSubscriptions,
    /// Set or query the server locale.
    #[serde(rename = "WGLAN")]
    SetLanguage,
    /// Force log persistence.
    #[serde(rename = "WLOG")]
    FlushLog,
    /// Write a parameter value.
    #[serde(rename = "WSP")]
    SetParameter,
}

impl RequestKind {
    /// All request kinds.
    pub const ALL: [Self; 10] = [
        Self::GetParameter,
        Self::GetParameterMetadata,
        Self::GetGroup,
        Self::GetGroupMetadata,
        Self::SubscribeParameter,
        Self::SubscribeGroup,
        Self::ClearSubscriptions,
        Self::SetLanguage,
        Self::FlushLog,
        Self::SetParameter,
    ];

    /// Wire tag of this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::GetParameter => "WGP",
            Self::GetParameterMetadata => "WGPM",
            Self::GetGroup => "WGPG",
            Self::GetGroupMetadata => "WGPMG",
            Self::SubscribeParameter => "WPUSHP",
            Self::SubscribeGroup => "WPUSHG",
            Self::ClearSubscriptions => "WPUSHC",
            Self::SetLanguage => "WGLAN",
            Self::FlushLog => "WLOG",
            Self::SetParameter => "WSP",
        }
    }

    /// Response kind the server answers this request with.
    #[must_use]
    pub const fn response(self) -> ResponseKind {
        match self {
            Self::GetParameter => ResponseKind::ParameterValue,
            Self::GetParameterMetadata => ResponseKind::ParameterMetadata,
            Self::GetGroup => ResponseKind::GroupValues,
            Self::GetGroupMetadata => ResponseKind::GroupMetadata,
            Self::SubscribeParameter => ResponseKind::PushAck,
            Self::SubscribeGroup => ResponseKind::GroupPushAck,
            Self::ClearSubscriptions => ResponseKind::PushCleared,
            Self::SetLanguage => ResponseKind::LanguageList,
            Self::FlushLog => ResponseKind::LogAck,
            Self::SetParameter => ResponseKind::SetAck,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for RequestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| Error::protocol(format!("unknown request kind: {s}")))
    }
}

// ============================================================================
// ResponseKind
// ============================================================================

/// Kinds of messages received from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseKind {
    /// A parameter value (polled or pushed).
    #[serde(rename = "MGP")]
    ParameterValue,
    /// Parameter metadata.
    #[serde(rename = "MGPM")]
    ParameterMetadata,
    /// Values or metadata of a group.
    #[serde(rename = "MGPG")]
    GroupValues,
    /// Group metadata.
    #[serde(rename = "MGPMG")]
    GroupMetadata,
    /// Push registration confirmation.
    #[serde(rename = "MPUSHP")]
    PushAck,
    /// Group push registration confirmation.
    #[serde(rename = "MPUSHG")]
    GroupPushAck,
    /// Push streams cleared.
    #[serde(rename = "MPUSHC")]
    PushCleared,
    /// Language list or language change confirmation.
    #[serde(rename = "MGLAN")]
    LanguageList,
    /// Log flush confirmation.
    #[serde(rename = "MLOG")]
    LogAck,
    /// Parameter write confirmation.
    #[serde(rename = "MSP")]
    SetAck,
}

impl ResponseKind {
    /// All response kinds.
    pub const ALL: [Self; 10] = [
        Self::ParameterValue,
        Self::ParameterMetadata,
        Self::GroupValues,
        Self::GroupMetadata,
        Self::PushAck,
        Self::GroupPushAck,
        Self::PushCleared,
        Self::LanguageList,
        Self::LogAck,
        Self::SetAck,
    ];

    /// Wire tag of this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ParameterValue => "MGP",
            Self::ParameterMetadata => "MGPM",
            Self::GroupValues => "MGPG",
            Self::GroupMetadata => "MGPMG",
            Self::PushAck => "MPUSHP",
            Self::GroupPushAck => "MPUSHG",
            Self::PushCleared => "MPUSHC",
            Self::LanguageList => "MGLAN",
            Self::LogAck => "MLOG",
            Self::SetAck => "MSP",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ResponseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| Error::protocol(format!("unknown response kind: {s}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
