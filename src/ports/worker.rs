use url::Url;

use crate::types::push::{ClientMessage, NotificationOptions};

/// An application window visible to the delivery worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NavigateError<E> {
    #[error("in-place navigation is not supported")]
    Unsupported,
    #[error("navigation failed: {0}")]
    Failed(E),
}

/// The delivery worker's global scope: notifications, windows and lifecycle.
pub trait WorkerScope: Send + Sync {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a, T>: Future<Output = Result<T, Self::Error>> + Send + 'a
    where
        Self: 'a,
        T: Send + 'a;
    type NavigateFut<'a>: Future<Output = Result<(), NavigateError<Self::Error>>> + Send + 'a
    where
        Self: 'a;

    fn show_notification<'a>(
        &'a self,
        title: &'a str,
        options: &'a NotificationOptions,
    ) -> Self::Fut<'a, ()>;
    /// Closing an already closed notification is a no-op.
    fn close_notification(&self, tag: &str);
    fn match_all_windows<'a>(
        &'a self,
        include_uncontrolled: bool,
    ) -> Self::Fut<'a, Vec<WindowClient>>;
    fn focus<'a>(&'a self, client: &'a WindowClient) -> Self::Fut<'a, ()>;
    fn navigate<'a>(&'a self, client: &'a WindowClient, url: &'a Url) -> Self::NavigateFut<'a>;
    fn post_message(&self, client: &WindowClient, message: &ClientMessage)
    -> Result<(), Self::Error>;
    fn open_window<'a>(&'a self, url: &'a Url) -> Self::Fut<'a, ()>;
    fn skip_waiting<'a>(&'a self) -> Self::Fut<'a, ()>;
}

/// Posts control messages from a window to the delivery worker.
pub trait WorkerMessenger: Send + Sync {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn post(&self, message: ClientMessage) -> Result<(), Self::Error>;
}
