//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and connecting a [`Client`].
//!
//! # Example
//!
//! ```no_run
//! use vpca_client::{Client, EngineOptions};
//!
//! # async fn example() -> vpca_client::Result<()> {
//! let client = Client::builder()
//!     .host("192.168.4.1")
//!     .options(EngineOptions::new().with_max_reconnect_attempts(10))
//!     .connect()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio::runtime::Handle;
use tracing::debug;
use url::Url;

use crate::engine::EngineOptions;
use crate::error::{Error, Result};

use super::connection::Client;

// ============================================================================
// Constants
// ============================================================================

/// Path of the VPCA WebSocket endpoint on the server.
pub const DEFAULT_PATH: &str = "/VPCA";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Explicit endpoint URL.
    endpoint: Option<String>,
    /// Server host (with optional port) for a derived endpoint.
    host: Option<String>,
    /// Derive `wss://` instead of `ws://`.
    tls: bool,
    /// Engine tuning.
    options: EngineOptions,
}

impl Client {
    /// Creates a builder for configuring a client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl ClientBuilder {
    /// Creates a new builder with no endpoint and default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full endpoint URL (`ws://` or `wss://`).
    ///
    /// Takes precedence over [`host`](Self::host).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the server host; the endpoint becomes `ws://{host}/VPCA`.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Uses `wss://` for an endpoint derived from [`host`](Self::host).
    #[inline]
    #[must_use]
    pub fn tls(mut self, enabled: bool) -> Self {
        self.tls = enabled;
        self
    }

    /// Sets the engine options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no endpoint or host is set, the scheme is not
    ///   `ws`/`wss`, or the options are invalid
    /// - [`Error::Url`] if the endpoint does not parse
    pub fn build(self) -> Result<ClientConfig> {
        let endpoint = self.validate_endpoint()?;
        self.options.validate()?;

        Ok(ClientConfig {
            endpoint,
            options: self.options,
        })
    }

    /// Validates the configuration and spawns the client, then opens it.
    ///
    /// Returns as soon as the event loop is running; use
    /// [`Client::wait_open`] to wait for the connection.
    ///
    /// # Errors
    ///
    /// Everything [`build`](Self::build) returns, plus [`Error::Config`]
    /// when called outside a Tokio runtime.
    pub fn connect(self) -> Result<Client> {
        self.build()?.connect()
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn validate_endpoint(&self) -> Result<Url> {
        let url = match (&self.endpoint, &self.host) {
            (Some(endpoint), _) => Url::parse(endpoint)?,
            (None, Some(host)) => {
                let scheme = if self.tls { "wss" } else { "ws" };
                Url::parse(&format!("{scheme}://{host}{DEFAULT_PATH}"))?
            }
            (None, None) => {
                return Err(Error::config(
                    "Endpoint is required. Use .endpoint() or .host() to set it.\n\
                     Example: Client::builder().host(\"192.168.4.1\")",
                ));
            }
        };

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Endpoint must use ws:// or wss://, got: {url}"
            )));
        }

        Ok(url)
    }
}

// ============================================================================
// ClientConfig
// ============================================================================

/// Validated client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    endpoint: Url,
    options: EngineOptions,
}

impl ClientConfig {
    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the engine options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Spawns the client and opens the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when called outside a Tokio runtime.
    pub fn connect(self) -> Result<Client> {
        Handle::try_current()
            .map_err(|_| Error::config("Client::connect must be called within a Tokio runtime"))?;

        debug!(endpoint = %self.endpoint, "Spawning client");
        let client = Client::spawn(self.endpoint, self.options);
        client.open()?;
        Ok(client)
    }
}

// ============================================================================
// Tests
// ============================================================================
