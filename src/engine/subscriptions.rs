//! Push subscriptions: registration, verification and refresh.

use tracing::{debug, error, info, trace};

use crate::identifiers::{Key, ListenerId, SubscriptionId};
use crate::protocol::{Message, PushRates, Request};

use super::core::{Engine, Notification, PushSynchronizer};
use super::hooks::run_guarded;
use super::push::{Confirmation, Subscription};
use super::registry::Listener;
use super::timer::TimerKind;

// ============================================================================
// Engine - Push Subscriptions
// ============================================================================

impl Engine {
    /// Starts a parameter push stream (`WPUSHP`).
    ///
    /// Pushed `MGP` values for `key` go to `listener`. Until the server
    /// confirms with `MPUSHP`, the registration is resent on every
    /// verification, up to the retry budget; after that the subscription is
    /// dropped and [`Notification::PushFailed`] is emitted.
    pub fn request_push(
        &mut self,
        key: impl Into<Key>,
        rates: PushRates,
        listener: Listener,
    ) -> SubscriptionId {
        let id = self.ids.subscription();
        self.attach_push(id, key.into(), rates, listener);
        id
    }

    /// Starts a group push stream (`WPUSHG`).
    ///
    /// The stream is not tracked; the `MPUSHG` reply attaches the group's
    /// listeners to its member parameters.
    pub fn request_group_push(&mut self, group: impl Into<Key>, rates: PushRates) {
        self.send(Request::subscribe_group(&group.into(), rates));
    }

    /// Cancels every push stream on the server (`WPUSHC`).
    pub fn clear_push(&mut self) {
        self.send(Request::clear_subscriptions());
    }

    /// Drops push subscriptions for `key` with the same `listener`, and the
    /// matching parameter listeners.
    ///
    /// Returns the number of dropped push subscriptions.
    pub fn unsubscribe(&mut self, key: &Key, listener: &Listener) -> usize {
        let removed = self.push.remove_matching(key, listener);
        for subscription in &removed {
            self.cancel_timer(subscription.verify_timer);
        }
        let listeners = self.parameters.remove_matching(|k| k == key, listener);
        debug!(
            %key,
            subscriptions = removed.len(),
            listeners,
            "Unsubscribed"
        );
        removed.len()
    }

    /// Drops one push subscription by handle.
    pub fn cancel_push(&mut self, id: SubscriptionId) -> bool {
        match self.push.remove(id) {
            Some(subscription) => {
                self.cancel_timer(subscription.verify_timer);
                true
            }
            None => false,
        }
    }

    /// Re-registers every tracked push stream.
    ///
    /// With `immediate == false` the refresh runs after the debounce delay;
    /// each call restarts the delay.
    pub fn refresh_push_requests(&mut self, immediate: bool) {
        let pending = self.refresh_timer.take();
        self.cancel_timer(pending);

        if immediate {
            self.refresh_push_now();
        } else {
            let delay = self.options.push_refresh_debounce;
            self.refresh_timer = Some(self.schedule(delay, TimerKind::RefreshPush));
            trace!(?delay, "Push refresh deferred");
        }
    }

    /// Registers a callback run after every push refresh.
    pub fn register_push_synchronizer(&mut self, synchronizer: PushSynchronizer) -> ListenerId {
        let id = self.ids.listener();
        self.attach_push_synchronizer(id, synchronizer);
        id
    }

    /// Removes a push synchronizer.
    pub fn remove_push_synchronizer(&mut self, id: ListenerId) -> bool {
        let before = self.synchronizers.len();
        self.synchronizers.retain(|(entry, _)| *entry != id);
        self.synchronizers.len() != before
    }

    pub(crate) fn attach_push_synchronizer(&mut self, id: ListenerId, synchronizer: PushSynchronizer) {
        self.synchronizers.push((id, synchronizer));
    }

    pub(crate) fn attach_push(
        &mut self,
        id: SubscriptionId,
        key: Key,
        rates: PushRates,
        listener: Listener,
    ) {
        debug!(%id, %key, ?rates, "Push requested");
        self.send(Request::subscribe_parameter(&key, rates));

        let timer = self.schedule(self.options.push_verify_delay, TimerKind::VerifyPush(id));
        self.push.insert(Subscription {
            id,
            key,
            rates,
            listener,
            confirmation: Confirmation::Pending {
                retries_left: self.options.push_retry_budget,
            },
            verify_timer: Some(timer),
        });
    }

    /// Checks a subscription after the verification delay.
    pub(crate) fn verify_push(&mut self, id: SubscriptionId) {
        let Some(subscription) = self.push.get_mut(id) else {
            trace!(%id, "Verification for dropped subscription");
            return;
        };
        subscription.verify_timer = None;

        match subscription.confirmation {
            Confirmation::Confirmed => {}
            Confirmation::Pending { retries_left: 0 } => {
                let key = subscription.key.clone();
                self.push.remove(id);
                error!(%id, %key, "Push subscription was never confirmed");
                self.notify(Notification::PushFailed {
                    subscription: id,
                    key,
                });
            }
            Confirmation::Pending { retries_left } => {
                subscription.confirmation = Confirmation::Pending {
                    retries_left: retries_left - 1,
                };
                let request = Request::subscribe_parameter(&subscription.key, subscription.rates);
                debug!(%id, retries_left = retries_left - 1, "Push unconfirmed, re-registering");

                self.send(request);
                let timer = self.schedule(self.options.push_verify_delay, TimerKind::VerifyPush(id));
                if let Some(subscription) = self.push.get_mut(id) {
                    subscription.verify_timer = Some(timer);
                }
            }
        }
    }

    pub(crate) fn confirm_push(&mut self, ack: &Message) {
        let timers = self.push.confirm(ack);
        trace!(confirmed = timers.len(), "Push acknowledged");
        for timer in timers {
            self.timers.cancel(timer);
        }
    }

    pub(crate) fn refresh_push_now(&mut self) {
        info!(subscriptions = self.push.len(), "Refreshing push streams");
        self.send(Request::clear_subscriptions());

        let budget = self.options.push_retry_budget;
        let mut stale = Vec::new();
        let mut requests = Vec::new();
        for subscription in self.push.iter_mut() {
            stale.extend(subscription.verify_timer.take());
            subscription.confirmation = Confirmation::Pending {
                retries_left: budget,
            };
            requests.push((
                subscription.id,
                Request::subscribe_parameter(&subscription.key, subscription.rates),
            ));
        }
        for timer in stale {
            self.timers.cancel(timer);
        }

        for (id, request) in requests {
            self.send(request);
            let timer = self.schedule(self.options.push_verify_delay, TimerKind::VerifyPush(id));
            if let Some(subscription) = self.push.get_mut(id) {
                subscription.verify_timer = Some(timer);
            }
        }

        let synchronizers: Vec<PushSynchronizer> =
            self.synchronizers.iter().map(|(_, s)| s.clone()).collect();
        for synchronizer in synchronizers {
            run_guarded(&"push synchronizer", || synchronizer());
        }
    }
}
