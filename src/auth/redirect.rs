//! One-shot local listener that catches the OAuth redirect for a
//! command-line login.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::{OAuthRedirect, RedirectQuery, Session, SessionError};
use crate::ports::KeyValueStore;
use crate::types::auth::AuthToken;

pub const REDIRECT_PATH: &str = "/oauth2/redirect";

#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("redirect listener stopped before a login arrived")]
    Closed,
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Clone)]
struct RedirectState {
    result: Arc<Mutex<Option<oneshot::Sender<OAuthRedirect>>>>,
}

/// Serves [`REDIRECT_PATH`] and reports the first redirect it receives.
pub fn router(result: oneshot::Sender<OAuthRedirect>) -> Router {
    let state = RedirectState {
        result: Arc::new(Mutex::new(Some(result))),
    };
    Router::new()
        .route(REDIRECT_PATH, get(receive_redirect))
        .with_state(state)
}

async fn receive_redirect(
    State(state): State<RedirectState>,
    Query(query): Query<RedirectQuery>,
) -> (StatusCode, &'static str) {
    let redirect = OAuthRedirect::from_query(query);
    let response = match &redirect {
        OAuthRedirect::Token(_) => (
            StatusCode::OK,
            "Signed in. You can close this window.",
        ),
        OAuthRedirect::Error(_) => (StatusCode::BAD_REQUEST, "Sign-in failed."),
        OAuthRedirect::Missing => (StatusCode::BAD_REQUEST, "No token received."),
    };

    match state.result.lock().expect("redirect result lock").take() {
        Some(sender) => {
            let _ = sender.send(redirect);
        }
        None => debug!("ignoring repeated oauth redirect"),
    }
    response
}

/// Waits for the backend to redirect the browser to `addr`, then stores the
/// token in `session`.
pub async fn listen_for_redirect<K: KeyValueStore>(
    addr: SocketAddr,
    session: &Session<K>,
) -> Result<AuthToken, RedirectError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| RedirectError::Bind { addr, source })?;
    info!(%addr, "waiting for oauth redirect");

    let (result_tx, result_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router(result_tx)).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    tokio::spawn(async move {
        if let Err(err) = server.await {
            debug!(%err, "redirect listener stopped");
        }
    });

    let redirect = result_rx.await.map_err(|_| RedirectError::Closed)?;
    let _ = stop_tx.send(());
    Ok(session.accept_redirect(redirect)?)
}
