use crate::types::auth::{AuthToken, UserProfile};
use crate::types::push::Subscription;
use crate::types::task::{NewTask, Task};

/// Subscription bookkeeping endpoints of the backend.
pub trait SubscriptionBackend: Send + Sync {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a, T>: Future<Output = Result<T, Self::Error>> + Send + 'a
    where
        Self: 'a,
        T: Send + 'a;

    fn check_subscription<'a>(
        &'a self,
        endpoint: &'a str,
        token: &'a AuthToken,
    ) -> Self::Fut<'a, bool>;
    fn save_subscription<'a>(
        &'a self,
        subscription: &'a Subscription,
        token: &'a AuthToken,
    ) -> Self::Fut<'a, ()>;
    fn delete_subscription<'a>(
        &'a self,
        endpoint: &'a str,
        token: &'a AuthToken,
    ) -> Self::Fut<'a, ()>;
}

pub trait TaskApi: Send + Sync {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a, T>: Future<Output = Result<T, Self::Error>> + Send + 'a
    where
        Self: 'a,
        T: Send + 'a;

    fn current_user<'a>(&'a self, token: &'a AuthToken) -> Self::Fut<'a, UserProfile>;
    fn list_tasks<'a>(&'a self, token: &'a AuthToken) -> Self::Fut<'a, Vec<Task>>;
    fn create_task<'a>(&'a self, task: &'a NewTask, token: &'a AuthToken) -> Self::Fut<'a, Task>;
    fn update_task<'a>(&'a self, task: &'a Task, token: &'a AuthToken) -> Self::Fut<'a, Task>;
    fn delete_task<'a>(&'a self, id: i64, token: &'a AuthToken) -> Self::Fut<'a, ()>;

    /// Whether the error means the token was refused.
    fn is_unauthorized(error: &Self::Error) -> bool;
}
