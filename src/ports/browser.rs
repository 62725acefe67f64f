use crate::types::push::{SubscribeOptions, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

/// What the current browser exposes for push delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub notifications: bool,
    pub service_worker: bool,
}

impl Capabilities {
    pub fn supports_push(&self) -> bool {
        self.notifications && self.service_worker
    }
}

pub trait NotificationPermissions: Send + Sync {
    type Fut<'a>: Future<Output = Permission> + Send + 'a
    where
        Self: 'a;

    fn capabilities(&self) -> Capabilities;
    fn permission(&self) -> Permission;
    /// Prompts the user. Browsers only honour this in response to a user action.
    fn request_permission<'a>(&'a self) -> Self::Fut<'a>;
}

/// The push manager of the application's worker registration.
pub trait PushService: Send + Sync {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a, T>: Future<Output = Result<T, Self::Error>> + Send + 'a
    where
        Self: 'a,
        T: Send + 'a;

    /// Resolves once the worker registration is active.
    fn ready<'a>(&'a self) -> Self::Fut<'a, ()>;
    fn get_subscription<'a>(&'a self) -> Self::Fut<'a, Option<Subscription>>;
    fn subscribe<'a>(&'a self, options: &'a SubscribeOptions) -> Self::Fut<'a, Subscription>;
    fn unsubscribe<'a>(&'a self, subscription: &'a Subscription) -> Self::Fut<'a, bool>;
}
