//! Error types for the VPCA client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use vpca_client::{Client, Result};
//!
//! async fn example() -> Result<()> {
//!     let client = Client::builder().host("192.168.0.1").connect()?;
//!     client.refresh(17)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::Decode`], [`Error::UnknownHook`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client or engine options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the transport cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The client's event loop has stopped.
    ///
    /// Returned by [`Client`](crate::Client) methods after shutdown.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected message shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// A frame could not be decoded into a message.
    ///
    /// The offending frame is kept (truncated) for logging.
    #[error("Decode error: {message} (frame: {frame})")]
    Decode {
        /// Description of the decode failure.
        message: String,
        /// The frame text that failed to decode.
        frame: String,
    },

    /// Hook registration named an unknown event.
    #[error("Unknown hook event: {name}")]
    UnknownHook {
        /// The rejected event name.
        name: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Endpoint URL could not be parsed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

/// Longest frame excerpt kept inside a decode error.
const MAX_FRAME_EXCERPT: usize = 256;

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a decode error, truncating long frames.
    pub fn decode(message: impl Into<String>, frame: &str) -> Self {
        let frame = match frame.char_indices().nth(MAX_FRAME_EXCERPT) {
            Some((cut, _)) => format!("{}...", &frame[..cut]),
            None => frame.to_string(),
        };
        Self::Decode {
            message: message.into(),
            frame,
        }
    }

    /// Creates an unknown hook error.
    #[inline]
    pub fn unknown_hook(name: impl Into<String>) -> Self {
        Self::UnknownHook { name: name.into() }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error came from decoding inbound data.
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors are handled locally by the engine (skip the frame,
    /// reconnect) rather than ending the session.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Connection { .. } | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("send delay must be non-zero");
        assert_eq!(
            err.to_string(),
            "Configuration error: send delay must be non-zero"
        );
    }

    #[test]
    fn test_decode_error_truncates_frame() {
        let frame = "x".repeat(1000);
        let err = Error::decode("bad json", &frame);
        match err {
            Error::Decode { frame, .. } => {
                assert_eq!(frame.len(), MAX_FRAME_EXCERPT + 3);
                assert!(frame.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_error_keeps_short_frame() {
        let err = Error::decode("bad json", "{oops");
        assert_eq!(err.to_string(), "Decode error: bad json (frame: {oops)");
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("x").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("x").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::decode("x", "y").is_recoverable());
        assert!(!Error::ConnectionClosed.is_recoverable());
        assert!(!Error::unknown_hook("onFoo").is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
