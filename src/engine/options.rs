//! Engine tuning options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use vpca_client::EngineOptions;
//!
//! let options = EngineOptions::new()
//!     .with_max_reconnect_attempts(3)
//!     .with_send_delay(Duration::from_millis(20));
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// EngineOptions
// ============================================================================

/// Timing and retry limits of the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Consecutive unintentional closes tolerated before giving up.
    pub max_reconnect_attempts: u32,

    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Delay between a response clearing the gate and the next transmission.
    pub send_delay: Duration,

    /// Delay before checking that a push registration was confirmed.
    pub push_verify_delay: Duration,

    /// Re-registrations attempted for an unconfirmed push subscription.
    pub push_retry_budget: u32,

    /// Quiet period before a deferred push refresh runs.
    pub push_refresh_debounce: Duration,
}

// ============================================================================
// Constructors
// ============================================================================

impl EngineOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            send_delay: Duration::from_millis(50),
            push_verify_delay: Duration::from_secs(1),
            push_retry_budget: 10,
            push_refresh_debounce: Duration::from_secs(1),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl EngineOptions {
    /// Sets the reconnect attempt limit.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the reconnect backoff.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the delay between a response and the next transmission.
    #[inline]
    #[must_use]
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    /// Sets the push verification delay.
    #[inline]
    #[must_use]
    pub fn with_push_verify_delay(mut self, delay: Duration) -> Self {
        self.push_verify_delay = delay;
        self
    }

    /// Sets the push re-registration budget.
    #[inline]
    #[must_use]
    pub fn with_push_retry_budget(mut self, retries: u32) -> Self {
        self.push_retry_budget = retries;
        self
    }

    /// Sets the push refresh debounce.
    #[inline]
    #[must_use]
    pub fn with_push_refresh_debounce(mut self, delay: Duration) -> Self {
        self.push_refresh_debounce = delay;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl EngineOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a reconnect is allowed with a zero delay
    /// or if push verification has a zero delay.
    pub fn validate(&self) -> Result<()> {
        if self.max_reconnect_attempts > 0 && self.reconnect_delay.is_zero() {
            return Err(Error::config(
                "reconnect_delay must be greater than zero when reconnects are enabled",
            ));
        }
        if self.push_verify_delay.is_zero() {
            return Err(Error::config("push_verify_delay must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
