use std::pin::Pin;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::ports::{SubscriptionBackend, TaskApi};
use crate::types::auth::{AuthToken, UserProfile};
use crate::types::push::Subscription;
use crate::types::task::{NewTask, Task};

const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend refused the token (HTTP {0})")]
    Unauthorized(u16),
    #[error("backend request failed (HTTP {status}): {body}")]
    Status { status: u16, body: String },
}

/// REST client for the task tracker backend. Every call carries the bearer
/// token it is given; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    fn request(&self, method: Method, path: &str, token: &AuthToken) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "backend request");
        Ok(self
            .client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, token.bearer()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), "backend response");
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response body>".to_string());
        Err(BackendError::Status {
            status: status.as_u16(),
            body: truncate_message(&body, ERROR_BODY_LIMIT),
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }
}

fn truncate_message(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let truncated: String = input.chars().take(max_chars).collect();
    format!("{truncated}...")
}

type BackendFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

impl SubscriptionBackend for HttpBackend {
    type Error = BackendError;
    type Fut<'a, T>
        = BackendFut<'a, T>
    where
        Self: 'a,
        T: Send + 'a;

    fn check_subscription<'a>(
        &'a self,
        endpoint: &'a str,
        token: &'a AuthToken,
    ) -> Self::Fut<'a, bool> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, "/api/push/check-subscription", token)?
                .json(&json!({ "endpoint": endpoint }));
            let body: Value = self.send_json(request).await?;
            Ok(body.get("belongsToUser") == Some(&Value::Bool(true)))
        })
    }

    fn save_subscription<'a>(
        &'a self,
        subscription: &'a Subscription,
        token: &'a AuthToken,
    ) -> Self::Fut<'a, ()> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, "/api/push/subscribe", token)?
                .json(subscription);
            self.send(request).await?;
            Ok(())
        })
    }

    fn delete_subscription<'a>(
        &'a self,
        endpoint: &'a str,
        token: &'a AuthToken,
    ) -> Self::Fut<'a, ()> {
        Box::pin(async move {
            let request = self
                .request(Method::DELETE, "/api/push/unsubscribe", token)?
                .json(&json!({ "endpoint": endpoint }));
            match self.send(request).await {
                Ok(_) => Ok(()),
                // Already gone server-side.
                Err(BackendError::Status { status: 404, .. }) => Ok(()),
                Err(err) => Err(err),
            }
        })
    }
}

impl TaskApi for HttpBackend {
    type Error = BackendError;
    type Fut<'a, T>
        = BackendFut<'a, T>
    where
        Self: 'a,
        T: Send + 'a;

    fn current_user<'a>(&'a self, token: &'a AuthToken) -> Self::Fut<'a, UserProfile> {
        Box::pin(async move {
            let request = self.request(Method::GET, "/api/auth/me", token)?;
            self.send_json(request).await
        })
    }

    fn list_tasks<'a>(&'a self, token: &'a AuthToken) -> Self::Fut<'a, Vec<Task>> {
        Box::pin(async move {
            let request = self.request(Method::GET, "/api/tasks", token)?;
            self.send_json(request).await
        })
    }

    fn create_task<'a>(&'a self, task: &'a NewTask, token: &'a AuthToken) -> Self::Fut<'a, Task> {
        Box::pin(async move {
            let request = self.request(Method::POST, "/api/tasks", token)?.json(task);
            self.send_json(request).await
        })
    }

    fn update_task<'a>(&'a self, task: &'a Task, token: &'a AuthToken) -> Self::Fut<'a, Task> {
        Box::pin(async move {
            let path = format!("/api/tasks/{}", task.id);
            let request = self.request(Method::PUT, &path, token)?.json(task);
            self.send_json(request).await
        })
    }

    fn delete_task<'a>(&'a self, id: i64, token: &'a AuthToken) -> Self::Fut<'a, ()> {
        Box::pin(async move {
            let path = format!("/api/tasks/{id}");
            let request = self.request(Method::DELETE, &path, token)?;
            self.send(request).await?;
            Ok(())
        })
    }

    fn is_unauthorized(error: &Self::Error) -> bool {
        matches!(error, BackendError::Unauthorized(_))
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::types::push::SubscriptionKeys;
    use crate::types::task::Priority;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get, post, put};
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    const OWNED_ENDPOINT: &str = "https://push.example/owned";

    #[derive(Clone, Default)]
    struct Recorded {
        requests: Arc<Mutex<Vec<(String, Value)>>>,
    }

    impl Recorded {
        fn push(&self, route: &str, body: Value) {
            self.requests
                .lock()
                .expect("requests lock")
                .push((route.to_string(), body));
        }

        fn all(&self) -> Vec<(String, Value)> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Bearer token-a")
    }

    async fn check_subscription(
        State(recorded): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        recorded.push("check", body.clone());
        let owned = body["endpoint"] == OWNED_ENDPOINT;
        Ok(Json(json!({ "belongsToUser": owned })))
    }

    async fn subscribe(State(recorded): State<Recorded>, Json(body): Json<Value>) -> StatusCode {
        recorded.push("subscribe", body);
        StatusCode::OK
    }

    async fn unsubscribe(State(recorded): State<Recorded>, Json(body): Json<Value>) -> StatusCode {
        recorded.push("unsubscribe", body);
        StatusCode::NOT_FOUND
    }

    async fn list_tasks() -> Json<Value> {
        Json(json!([
            {
                "id": 42,
                "title": "File taxes",
                "completed": false,
                "priority": "HIGH",
                "dueDate": "2025-01-15T09:00:00Z",
                "notificationsEnabled": true
            },
            { "id": 43, "title": "Water plants" }
        ]))
    }

    async fn create_task() -> (StatusCode, String) {
        (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(500))
    }

    async fn update_task(Path(id): Path<i64>, Json(mut body): Json<Value>) -> Json<Value> {
        body["id"] = json!(id);
        Json(body)
    }

    async fn me() -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    async fn spawn_backend() -> (HttpBackend, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .route("/api/push/check-subscription", post(check_subscription))
            .route("/api/push/subscribe", post(subscribe))
            .route("/api/push/unsubscribe", delete(unsubscribe))
            .route("/api/tasks", get(list_tasks).post(create_task))
            .route("/api/tasks/{id}", put(update_task))
            .route("/api/auth/me", get(me))
            .with_state(recorded.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind backend");
        let addr = listener.local_addr().expect("backend addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve backend");
        });

        let base = Url::parse(&format!("http://{addr}/")).expect("base url");
        let backend = HttpBackend::new(base, Duration::from_secs(5)).expect("backend");
        (backend, recorded)
    }

    fn token() -> AuthToken {
        AuthToken::new("token-a").expect("token")
    }

    fn subscription() -> Subscription {
        Subscription {
            endpoint: "https://push.example/new".to_string(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn check_subscription__should_read_belongs_to_user() {
        // Given
        let (backend, recorded) = spawn_backend().await;

        // When
        let owned = backend
            .check_subscription(OWNED_ENDPOINT, &token())
            .await
            .expect("check owned");
        let foreign = backend
            .check_subscription("https://push.example/other", &token())
            .await
            .expect("check foreign");

        // Then
        assert!(owned);
        assert!(!foreign);
        assert_eq!(
            recorded.all()[0],
            ("check".to_string(), json!({ "endpoint": OWNED_ENDPOINT }))
        );
    }

    #[tokio::test]
    async fn check_subscription__should_report_rejected_token() {
        let (backend, _) = spawn_backend().await;
        let stranger = AuthToken::new("token-b").expect("token");

        let result = backend.check_subscription(OWNED_ENDPOINT, &stranger).await;

        assert!(matches!(result, Err(BackendError::Unauthorized(401))));
    }

    #[tokio::test]
    async fn save_subscription__should_post_browser_json_shape() {
        // Given
        let (backend, recorded) = spawn_backend().await;

        // When
        backend
            .save_subscription(&subscription(), &token())
            .await
            .expect("save subscription");

        // Then
        let (route, body) = recorded.all().remove(0);
        assert_eq!(route, "subscribe");
        assert_eq!(
            body,
            json!({
                "endpoint": "https://push.example/new",
                "expirationTime": null,
                "keys": { "p256dh": "p256", "auth": "auth" }
            })
        );
    }

    #[tokio::test]
    async fn delete_subscription__should_accept_missing_record() {
        let (backend, recorded) = spawn_backend().await;

        let result = backend
            .delete_subscription("https://push.example/gone", &token())
            .await;

        assert!(result.is_ok());
        assert_eq!(recorded.all()[0].0, "unsubscribe");
    }

    #[tokio::test]
    async fn list_tasks__should_decode_backend_tasks() {
        // When
        let (backend, _) = spawn_backend().await;
        let tasks = backend.list_tasks(&token()).await.expect("list tasks");

        // Then
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, 42);
        assert_eq!(tasks[0].priority, Priority::High);
        assert!(tasks[0].notifications_enabled);
        assert_eq!(tasks[1].priority, Priority::Medium);
        assert!(tasks[1].due_date.is_none());
    }

    #[tokio::test]
    async fn create_task__should_truncate_error_body() {
        let (backend, _) = spawn_backend().await;

        let result = backend
            .create_task(&NewTask::titled("Write report"), &token())
            .await;

        let Err(BackendError::Status { status, body }) = result else {
            panic!("expected status error, got {result:?}");
        };
        assert_eq!(status, 500);
        assert_eq!(body.chars().count(), ERROR_BODY_LIMIT + 3);
        assert!(body.ends_with("..."));
    }

    #[tokio::test]
    async fn update_task__should_put_to_task_path() {
        let (backend, _) = spawn_backend().await;
        let task = Task {
            id: 7,
            title: "Call mom".to_string(),
            completed: true,
            priority: Priority::Low,
            due_date: None,
            notifications_enabled: false,
        };

        let updated = backend.update_task(&task, &token()).await.expect("update");

        assert_eq!(updated, task);
    }

    #[tokio::test]
    async fn current_user__should_flag_unauthorized() {
        let (backend, _) = spawn_backend().await;

        let err = backend
            .current_user(&token())
            .await
            .expect_err("me should fail");

        assert!(<HttpBackend as TaskApi>::is_unauthorized(&err));
    }

    #[test]
    fn endpoint__should_join_paths_without_double_slash() {
        let backend = HttpBackend::new(
            Url::parse("https://api.example/").expect("url"),
            Duration::from_secs(1),
        )
        .expect("backend");

        let url = backend.endpoint("/api/tasks/5").expect("endpoint");

        assert_eq!(url.as_str(), "https://api.example/api/tasks/5");
    }
}
