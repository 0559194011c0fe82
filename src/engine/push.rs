//! Push subscription bookkeeping.
//!
//! Each subscription waits for an `MPUSHP` confirmation. Until it arrives the
//! engine re-registers it on every verification, spending one unit of its
//! retry budget each time.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::identifiers::{Key, SubscriptionId, TimerId};
use crate::protocol::{Message, PushRates};

use super::registry::Listener;

// ============================================================================
// Confirmation
// ============================================================================

/// Confirmation state of a push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Not yet confirmed; `retries_left` re-registrations remain.
    Pending {
        /// Remaining re-registrations.
        retries_left: u32,
    },
    /// The server acknowledged the stream.
    Confirmed,
}

impl Confirmation {
    /// Returns `true` once confirmed.
    #[inline]
    #[must_use]
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A tracked parameter push stream.
pub struct Subscription {
    /// Handle returned to the caller.
    pub id: SubscriptionId,
    /// Parameter the stream is for.
    pub key: Key,
    /// Requested update rates.
    pub rates: PushRates,
    /// Receives pushed values.
    pub listener: Listener,
    /// Confirmation state.
    pub confirmation: Confirmation,
    /// Pending verification timer.
    pub verify_timer: Option<TimerId>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("rates", &self.rates)
            .field("confirmation", &self.confirmation)
            .field("verify_timer", &self.verify_timer)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PushTable
// ============================================================================

/// Tracked push subscriptions, in subscription order.
#[derive(Debug, Default)]
pub struct PushTable {
    subscriptions: Vec<Subscription>,
}

impl PushTable {
    /// Adds a subscription.
    pub fn insert(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    /// Returns the subscription with handle `id`.
    #[must_use]
    pub fn get(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.id == id)
    }

    /// Returns the subscription with handle `id` mutably.
    pub fn get_mut(&mut self, id: SubscriptionId) -> Option<&mut Subscription> {
        self.subscriptions.iter_mut().find(|s| s.id == id)
    }

    /// Removes the subscription with handle `id`.
    pub fn remove(&mut self, id: SubscriptionId) -> Option<Subscription> {
        let index = self.subscriptions.iter().position(|s| s.id == id)?;
        Some(self.subscriptions.remove(index))
    }

    /// Removes every subscription for `key` with the same `listener`.
    pub fn remove_matching(&mut self, key: &Key, listener: &Listener) -> Vec<Subscription> {
        let (removed, kept) = std::mem::take(&mut self.subscriptions)
            .into_iter()
            .partition(|s| s.key == *key && Arc::ptr_eq(&s.listener, listener));
        self.subscriptions = kept;
        removed
    }

    /// Marks every subscription the acknowledgement concerns as confirmed.
    ///
    /// Returns the verification timers that no longer need to fire.
    pub fn confirm(&mut self, ack: &Message) -> Vec<TimerId> {
        self.subscriptions
            .iter_mut()
            .filter(|s| ack.concerns(&s.key))
            .filter_map(|s| {
                s.confirmation = Confirmation::Confirmed;
                s.verify_timer.take()
            })
            .collect()
    }

    /// Returns the listeners of subscriptions a pushed value concerns.
    #[must_use]
    pub fn listeners_for(&self, message: &Message) -> Vec<Listener> {
        self.subscriptions
            .iter()
            .filter(|s| message.concerns(&s.key))
            .map(|s| Arc::clone(&s.listener))
            .collect()
    }

    /// Iterates over subscriptions mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Subscription> {
        self.subscriptions.iter_mut()
    }

    /// Iterates over subscriptions.
    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter()
    }

    /// Returns the number of tracked subscriptions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns `true` if nothing is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
