use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::ports::{KeyValueStore, TaskApi};
use crate::types::auth::{AuthToken, UserProfile};

pub mod redirect;

pub const TOKEN_KEY: &str = "jwt_token";
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    pub fn slug(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            other => Err(format!(
                "unknown provider '{other}'; expected google or facebook"
            )),
        }
    }
}

/// Where the browser is sent to start an OAuth login.
pub fn authorization_url(api_base_url: &Url, provider: Provider) -> Result<Url, url::ParseError> {
    let base = api_base_url.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/oauth2/authorization/{}", provider.slug()))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

/// What the backend handed back on `/oauth2/redirect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthRedirect {
    Token(AuthToken),
    Error(String),
    Missing,
}

impl OAuthRedirect {
    /// An `error` parameter wins over any token sent alongside it.
    pub fn from_query(query: RedirectQuery) -> Self {
        if let Some(error) = query.error.filter(|error| !error.trim().is_empty()) {
            return OAuthRedirect::Error(error);
        }
        match query.token.as_deref().and_then(AuthToken::new) {
            Some(token) => OAuthRedirect::Token(token),
            None => OAuthRedirect::Missing,
        }
    }
}

pub fn parse_oauth_redirect(url: &Url) -> OAuthRedirect {
    let mut query = RedirectQuery::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "token" if query.token.is_none() => query.token = Some(value.into_owned()),
            "error" if query.error.is_none() => query.error = Some(value.into_owned()),
            _ => {}
        }
    }
    OAuthRedirect::from_query(query)
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("not signed in")]
    NotSignedIn,
    #[error("sign-in failed: {0}")]
    OAuth(String),
    #[error("sign-in redirect carried no token")]
    MissingToken,
    #[error("session expired, sign in again")]
    Expired,
    #[error("token storage failed: {0}")]
    Store(String),
    #[error("{0}")]
    Backend(String),
}

/// The persisted login. The token is read from the store on every use and
/// never kept in memory between calls.
pub struct Session<K> {
    store: Arc<K>,
}

impl<K> Clone for Session<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<K: KeyValueStore> Session<K> {
    pub fn new(store: Arc<K>) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Result<Option<AuthToken>, SessionError> {
        let raw = self
            .store
            .get(TOKEN_KEY)
            .map_err(|err| SessionError::Store(err.to_string()))?;
        Ok(raw.and_then(AuthToken::new))
    }

    pub fn require_token(&self) -> Result<AuthToken, SessionError> {
        self.token()?.ok_or(SessionError::NotSignedIn)
    }

    pub fn store_token(&self, token: &AuthToken) -> Result<(), SessionError> {
        self.store
            .set(TOKEN_KEY, token.as_str())
            .map_err(|err| SessionError::Store(err.to_string()))
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        for key in [TOKEN_KEY, USER_KEY] {
            self.store
                .remove(key)
                .map_err(|err| SessionError::Store(err.to_string()))?;
        }
        Ok(())
    }

    pub fn accept_redirect(&self, redirect: OAuthRedirect) -> Result<AuthToken, SessionError> {
        match redirect {
            OAuthRedirect::Token(token) => {
                self.store_token(&token)?;
                info!("signed in");
                Ok(token)
            }
            OAuthRedirect::Error(error) => {
                warn!(%error, "oauth provider reported an error");
                Err(SessionError::OAuth(error))
            }
            OAuthRedirect::Missing => {
                warn!("oauth redirect without token");
                Err(SessionError::MissingToken)
            }
        }
    }

    /// Loads the signed-in user. A refused token is dropped from the store.
    pub async fn current_user<A: TaskApi>(&self, api: &A) -> Result<UserProfile, SessionError> {
        let token = self.require_token()?;
        match api.current_user(&token).await {
            Ok(profile) => {
                if let Ok(cached) = serde_json::to_string(&profile)
                    && let Err(err) = self.store.set(USER_KEY, &cached)
                {
                    warn!(%err, "failed to cache user profile");
                }
                Ok(profile)
            }
            Err(err) if A::is_unauthorized(&err) => {
                warn!(%err, "token rejected, clearing session");
                self.clear()?;
                Err(SessionError::Expired)
            }
            Err(err) => Err(SessionError::Backend(err.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::types::task::{NewTask, Task};
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    pub(crate) enum TestApiError {
        Unauthorized,
        Down,
    }

    impl std::fmt::Display for TestApiError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestApiError::Unauthorized => f.write_str("unauthorized"),
                TestApiError::Down => f.write_str("backend down"),
            }
        }
    }

    /// Task backend that accepts a single token and keeps tasks in memory.
    #[derive(Clone, Default)]
    pub(crate) struct TestApi {
        pub(crate) accepted: String,
        pub(crate) down: bool,
        pub(crate) tasks: Arc<Mutex<Vec<Task>>>,
    }

    impl TestApi {
        pub(crate) fn accepting(token: &str) -> Self {
            Self {
                accepted: token.to_string(),
                ..Self::default()
            }
        }

        fn check(&self, token: &AuthToken) -> Result<(), TestApiError> {
            if self.down {
                return Err(TestApiError::Down);
            }
            if token.as_str() != self.accepted {
                return Err(TestApiError::Unauthorized);
            }
            Ok(())
        }
    }

    impl TaskApi for TestApi {
        type Error = TestApiError;
        type Fut<'a, T>
            = std::future::Ready<Result<T, TestApiError>>
        where
            Self: 'a,
            T: Send + 'a;

        fn current_user<'a>(&'a self, token: &'a AuthToken) -> Self::Fut<'a, UserProfile> {
            std::future::ready(self.check(token).map(|()| UserProfile {
                email: Some("ada@example.com".to_string()),
                name: Some("Ada".to_string()),
                extra: Default::default(),
            }))
        }

        fn list_tasks<'a>(&'a self, token: &'a AuthToken) -> Self::Fut<'a, Vec<Task>> {
            std::future::ready(
                self.check(token)
                    .map(|()| self.tasks.lock().expect("tasks lock").clone()),
            )
        }

        fn create_task<'a>(&'a self, task: &'a NewTask, token: &'a AuthToken) -> Self::Fut<'a, Task> {
            std::future::ready(self.check(token).map(|()| {
                let mut tasks = self.tasks.lock().expect("tasks lock");
                let id = tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1;
                let created = Task {
                    id,
                    title: task.title.clone(),
                    completed: task.completed,
                    priority: task.priority,
                    due_date: task.due_date,
                    notifications_enabled: task.notifications_enabled,
                };
                tasks.push(created.clone());
                created
            }))
        }

        fn update_task<'a>(&'a self, task: &'a Task, token: &'a AuthToken) -> Self::Fut<'a, Task> {
            std::future::ready(self.check(token).map(|()| {
                let mut tasks = self.tasks.lock().expect("tasks lock");
                if let Some(existing) = tasks.iter_mut().find(|existing| existing.id == task.id) {
                    *existing = task.clone();
                }
                task.clone()
            }))
        }

        fn delete_task<'a>(&'a self, id: i64, token: &'a AuthToken) -> Self::Fut<'a, ()> {
            std::future::ready(self.check(token).map(|()| {
                self.tasks.lock().expect("tasks lock").retain(|task| task.id != id);
            }))
        }

        fn is_unauthorized(error: &Self::Error) -> bool {
            *error == TestApiError::Unauthorized
        }
    }

    pub(crate) fn signed_in(token: &str) -> Session<MemoryStore> {
        let session = Session::new(Arc::new(MemoryStore::default()));
        session
            .store_token(&AuthToken::new(token).expect("token"))
            .expect("store token");
        session
    }

    #[test]
    fn parse_oauth_redirect__should_prefer_error_over_token() {
        // Given
        let url = Url::parse("http://localhost:3000/oauth2/redirect?token=abc&error=access_denied")
            .expect("url");

        // When
        let redirect = parse_oauth_redirect(&url);

        // Then
        assert_eq!(redirect, OAuthRedirect::Error("access_denied".to_string()));
    }

    #[test]
    fn parse_oauth_redirect__should_extract_token() {
        let url = Url::parse("http://localhost:3000/oauth2/redirect?token=eyJ.abc.def").expect("url");

        let redirect = parse_oauth_redirect(&url);

        assert_eq!(
            redirect,
            OAuthRedirect::Token(AuthToken::new("eyJ.abc.def").expect("token"))
        );
    }

    #[test]
    fn parse_oauth_redirect__should_report_missing_token() {
        let url = Url::parse("http://localhost:3000/oauth2/redirect?token=").expect("url");

        assert_eq!(parse_oauth_redirect(&url), OAuthRedirect::Missing);
    }

    #[test]
    fn authorization_url__should_point_at_provider_endpoint() {
        let api = Url::parse("https://api.example/").expect("url");

        let url = authorization_url(&api, Provider::Facebook).expect("authorization url");

        assert_eq!(url.as_str(), "https://api.example/oauth2/authorization/facebook");
    }

    #[test]
    fn provider__should_parse_case_insensitively() {
        assert_eq!("Google".parse::<Provider>(), Ok(Provider::Google));
        assert!("github".parse::<Provider>().is_err());
    }

    #[test]
    fn accept_redirect__should_store_token_under_jwt_key() {
        // Given
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(Arc::clone(&store));
        let redirect = OAuthRedirect::Token(AuthToken::new("abc").expect("token"));

        // When
        session.accept_redirect(redirect).expect("accept");

        // Then
        assert_eq!(store.get(TOKEN_KEY).expect("get").as_deref(), Some("abc"));
    }

    #[test]
    fn accept_redirect__should_not_store_on_error() {
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(Arc::clone(&store));

        let result = session.accept_redirect(OAuthRedirect::Error("denied".to_string()));

        assert!(matches!(result, Err(SessionError::OAuth(_))));
        assert_eq!(store.get(TOKEN_KEY).expect("get"), None);
    }

    #[tokio::test]
    async fn current_user__should_clear_rejected_token() {
        // Given
        let session = signed_in("stale");
        let api = TestApi::accepting("fresh");

        // When
        let result = session.current_user(&api).await;

        // Then
        assert!(matches!(result, Err(SessionError::Expired)));
        assert!(session.token().expect("token").is_none());
    }

    #[tokio::test]
    async fn current_user__should_keep_token_when_backend_is_down() {
        let session = signed_in("fresh");
        let api = TestApi {
            down: true,
            ..TestApi::accepting("fresh")
        };

        let result = session.current_user(&api).await;

        assert!(matches!(result, Err(SessionError::Backend(_))));
        assert!(session.token().expect("token").is_some());
    }

    #[tokio::test]
    async fn current_user__should_cache_profile() {
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(Arc::clone(&store));
        session
            .store_token(&AuthToken::new("fresh").expect("token"))
            .expect("store");

        let profile = session
            .current_user(&TestApi::accepting("fresh"))
            .await
            .expect("profile");

        assert_eq!(profile.display_name(), "Ada");
        assert!(store.get(USER_KEY).expect("get").is_some());
    }
}
