use tracing::{debug, info, warn};

use crate::ports::SubscriptionBackend;
use crate::types::auth::AuthToken;
use crate::types::push::Subscription;

/// Backend Sync Client: records subscriptions server-side and answers
/// ownership questions for the subscription manager.
#[derive(Debug, Clone)]
pub struct BackendSync<B> {
    backend: B,
}

impl<B: SubscriptionBackend> BackendSync<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Whether `endpoint` is registered to the token's user. Anything that
    /// prevents a definite answer counts as "not owned".
    pub async fn check_ownership(&self, endpoint: &str, token: &AuthToken) -> bool {
        match self.backend.check_subscription(endpoint, token).await {
            Ok(owned) => {
                debug!(endpoint, owned, "subscription ownership checked");
                owned
            }
            Err(err) => {
                warn!(endpoint, %err, "ownership check failed, treating subscription as not owned");
                false
            }
        }
    }

    pub async fn persist(&self, subscription: &Subscription, token: &AuthToken) -> Result<(), String> {
        match self.backend.save_subscription(subscription, token).await {
            Ok(()) => {
                info!(endpoint = %subscription.endpoint, "subscription saved to backend");
                Ok(())
            }
            Err(err) => {
                warn!(endpoint = %subscription.endpoint, %err, "failed to save subscription");
                Err(err.to_string())
            }
        }
    }

    /// Best effort removal of the server-side record.
    pub async fn forget(&self, endpoint: &str, token: &AuthToken) -> bool {
        match self.backend.delete_subscription(endpoint, token).await {
            Ok(()) => true,
            Err(err) => {
                warn!(endpoint, %err, "failed to remove subscription from backend");
                false
            }
        }
    }
}
