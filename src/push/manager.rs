use std::sync::Mutex;

use tracing::{info, warn};

use crate::config::PushConfig;
use crate::error::PushError;
use crate::ports::{NotificationPermissions, PushService, SubscriptionBackend};
use crate::push::key_codec::decode_server_key;
use crate::push::permission::PermissionGate;
use crate::push::sync::BackendSync;
use crate::types::auth::AuthToken;
use crate::types::push::{SubscribeOptions, Subscription};

/// Subscription lifecycle of one browser installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unregistered,
    Ready,
    Subscribed,
    Failed,
}

/// Owns the subscribe / reconcile / unsubscribe protocol. It is the only
/// component allowed to create or destroy the push subscription.
pub struct SubscriptionManager<P, S, B> {
    gate: PermissionGate<P>,
    push: S,
    sync: BackendSync<B>,
    server_key: Vec<u8>,
    state: Mutex<SubscriptionState>,
}

impl<P, S, B> SubscriptionManager<P, S, B>
where
    P: NotificationPermissions,
    S: PushService,
    B: SubscriptionBackend,
{
    /// Fails with `InvalidKeyFormat` before touching any browser facility if
    /// the configured server key cannot be decoded.
    pub fn new(config: &PushConfig, permissions: P, push: S, backend: B) -> Result<Self, PushError> {
        let server_key = decode_server_key(&config.server_key)?;
        Ok(Self {
            gate: PermissionGate::new(permissions),
            push,
            sync: BackendSync::new(backend),
            server_key,
            state: Mutex::new(SubscriptionState::Unregistered),
        })
    }

    pub fn state(&self) -> SubscriptionState {
        *self.state.lock().expect("subscription state lock")
    }

    fn set_state(&self, state: SubscriptionState) {
        *self.state.lock().expect("subscription state lock") = state;
    }

    fn fail(&self, error: PushError) -> PushError {
        warn!(%error, "push subscription failed");
        self.set_state(SubscriptionState::Failed);
        error
    }

    /// Returns a subscription that the backend knows belongs to the token's
    /// user, creating and persisting one if needed.
    ///
    /// A reused subscription is not persisted again, so repeated calls for the
    /// same user leave a single backend record.
    pub async fn ensure_subscription(&self, token: &AuthToken) -> Result<Subscription, PushError> {
        self.gate.ensure_granted().await?;

        if let Err(err) = self.push.ready().await {
            return Err(self.fail(PushError::SubscribeFailed(format!(
                "worker registration failed: {err}"
            ))));
        }
        self.set_state(SubscriptionState::Ready);

        let existing = match self.push.get_subscription().await {
            Ok(existing) => existing,
            Err(err) => {
                return Err(self.fail(PushError::SubscribeFailed(format!(
                    "could not read existing subscription: {err}"
                ))));
            }
        };

        if let Some(existing) = existing {
            if self.sync.check_ownership(&existing.endpoint, token).await {
                info!(endpoint = %existing.endpoint, "reusing subscription owned by current user");
                self.set_state(SubscriptionState::Subscribed);
                return Ok(existing);
            }

            info!(endpoint = %existing.endpoint, "discarding subscription not owned by current user");
            if let Err(err) = self.push.unsubscribe(&existing).await {
                return Err(self.fail(PushError::SubscribeFailed(format!(
                    "could not remove previous subscription: {err}"
                ))));
            }
            self.set_state(SubscriptionState::Ready);
        }

        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key: self.server_key.clone(),
        };
        let subscription = match self.push.subscribe(&options).await {
            Ok(subscription) => subscription,
            Err(err) => return Err(self.fail(PushError::SubscribeFailed(err.to_string()))),
        };
        info!(endpoint = %subscription.endpoint, "push subscription created");
        self.set_state(SubscriptionState::Subscribed);

        if let Err(reason) = self.sync.persist(&subscription, token).await {
            return Err(PushError::BackendSyncFailed {
                subscription: Box::new(subscription),
                reason,
            });
        }

        Ok(subscription)
    }

    /// Drops the local subscription and asks the backend to forget it, e.g.
    /// on logout. Returns whether a subscription existed.
    pub async fn teardown(&self, token: &AuthToken) -> Result<bool, PushError> {
        let existing = self
            .push
            .get_subscription()
            .await
            .map_err(|err| PushError::SubscribeFailed(err.to_string()))?;
        let Some(existing) = existing else {
            return Ok(false);
        };

        self.push
            .unsubscribe(&existing)
            .await
            .map_err(|err| PushError::SubscribeFailed(err.to_string()))?;
        self.set_state(SubscriptionState::Ready);
        self.sync.forget(&existing.endpoint, token).await;
        info!(endpoint = %existing.endpoint, "push subscription removed");
        Ok(true)
    }
}
