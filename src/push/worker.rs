//! Background delivery worker.
//!
//! The worker keeps no state between events: every handler works only from
//! the event, its ports and the static [`WorkerConfig`]. Each handler returns
//! a [`WorkerOutcome`] instead of an error, since a failure inside the worker
//! is invisible to the user unless it still ends in a notification or a window.

use serde_json::{Map, Value, json};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use url::Url;

use crate::ports::{NavigateError, TimeProvider, WindowClient, WorkerScope};
use crate::types::push::{
    ClientMessage, DisplayNotification, NotificationAction, NotificationOptions, ShownNotification,
};

pub const DEFAULT_TITLE: &str = "Task Manager Pro";
pub const DEFAULT_BODY: &str = "You have a notification";
const NOTIFICATION_ICON: &str = "/logo192.png";
const VIBRATION_PATTERN: [u32; 3] = [200, 100, 200];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// The one URL every notification click leads to.
    pub target_url: Url,
    pub default_title: String,
    pub default_body: String,
}

impl WorkerConfig {
    pub fn new(target_url: Url) -> Self {
        Self {
            target_url,
            default_title: DEFAULT_TITLE.to_string(),
            default_body: DEFAULT_BODY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Push {
        body: Option<Vec<u8>>,
    },
    NotificationClick {
        notification: ShownNotification,
        action: Option<String>,
    },
    NotificationClose {
        notification: ShownNotification,
    },
    Message(ClientMessage),
}

/// How a notification click reached the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRoute {
    Navigated,
    Messaged,
    OpenedWindow,
    /// An earlier step failed and the catch-all opened a window.
    OpenedAfterError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Displayed,
    DisplayFailed,
    Clicked(ClickRoute),
    ClickFailed,
    Closed,
    Activated,
    ActivationFailed,
    Ignored,
}

/// An event plus the handle the host waits on; the reply is only sent once
/// the handler has finished all of its work.
#[derive(Debug)]
pub struct WorkerEnvelope {
    pub event: WorkerEvent,
    pub done: Option<oneshot::Sender<WorkerOutcome>>,
}

impl WorkerEnvelope {
    pub fn new(event: WorkerEvent) -> (Self, oneshot::Receiver<WorkerOutcome>) {
        let (done, receiver) = oneshot::channel();
        (
            Self {
                event,
                done: Some(done),
            },
            receiver,
        )
    }
}

/// Builds the notification for a push body. Empty, unparseable and
/// non-object bodies are treated as `{}`.
pub fn render_push(body: Option<&[u8]>, config: &WorkerConfig, now_millis: i64) -> DisplayNotification {
    let payload = body
        .and_then(|bytes| serde_json::from_slice::<Value>(bytes).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    let title = text_field(&payload, "title").unwrap_or_else(|| config.default_title.clone());
    let body = text_field(&payload, "body").unwrap_or_else(|| config.default_body.clone());
    let data = match payload.get("data") {
        Some(data) if is_truthy(data) => data.clone(),
        _ => json!({ "dateOfArrival": now_millis, "primaryKey": 1 }),
    };

    DisplayNotification {
        title,
        options: NotificationOptions {
            body,
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_ICON.to_string(),
            vibrate: VIBRATION_PATTERN.to_vec(),
            data,
            actions: vec![
                NotificationAction {
                    action: "view".to_string(),
                    title: "View Task".to_string(),
                },
                NotificationAction {
                    action: "close".to_string(),
                    title: "Close".to_string(),
                },
            ],
        },
    }
}

fn text_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        _ => None,
    }
}

// Senders may put any JSON under `data`; only "empty" values get replaced.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn same_origin(candidate: &str, target: &Url) -> bool {
    match Url::parse(candidate) {
        Ok(url) => url.origin() == target.origin(),
        Err(_) => false,
    }
}

pub struct DeliveryWorker<S, T> {
    scope: S,
    time: T,
    config: WorkerConfig,
}

impl<S, T> DeliveryWorker<S, T>
where
    S: WorkerScope,
    T: TimeProvider,
{
    pub fn new(scope: S, time: T, config: WorkerConfig) -> Self {
        Self {
            scope,
            time,
            config,
        }
    }

    pub async fn handle(&self, event: WorkerEvent) -> WorkerOutcome {
        match event {
            WorkerEvent::Push { body } => self.on_push(body.as_deref()).await,
            WorkerEvent::NotificationClick {
                notification,
                action,
            } => self.on_click(&notification, action.as_deref()).await,
            WorkerEvent::NotificationClose { notification } => {
                debug!(tag = %notification.tag, "notification dismissed");
                WorkerOutcome::Closed
            }
            WorkerEvent::Message(ClientMessage::SkipWaiting) => match self.scope.skip_waiting().await {
                Ok(()) => {
                    info!("activating updated worker");
                    WorkerOutcome::Activated
                }
                Err(err) => {
                    warn!(%err, "skip waiting failed");
                    WorkerOutcome::ActivationFailed
                }
            },
            WorkerEvent::Message(message) => {
                debug!(?message, "ignoring message");
                WorkerOutcome::Ignored
            }
        }
    }

    async fn on_push(&self, body: Option<&[u8]>) -> WorkerOutcome {
        let notification = render_push(body, &self.config, self.time.now_millis());
        match self
            .scope
            .show_notification(&notification.title, &notification.options)
            .await
        {
            Ok(()) => {
                info!(title = %notification.title, "notification displayed");
                WorkerOutcome::Displayed
            }
            Err(err) => {
                warn!(%err, "failed to display notification");
                WorkerOutcome::DisplayFailed
            }
        }
    }

    async fn on_click(&self, notification: &ShownNotification, action: Option<&str>) -> WorkerOutcome {
        self.scope.close_notification(&notification.tag);
        let task_id = notification.task_id();
        debug!(tag = %notification.tag, ?action, ?task_id, "notification clicked");

        match self.route_click(task_id).await {
            Ok(route) => WorkerOutcome::Clicked(route),
            Err(err) => {
                warn!(%err, "click routing failed, opening a new window");
                match self.scope.open_window(&self.config.target_url).await {
                    Ok(()) => WorkerOutcome::Clicked(ClickRoute::OpenedAfterError),
                    Err(err) => {
                        warn!(%err, "last resort window open failed");
                        WorkerOutcome::ClickFailed
                    }
                }
            }
        }
    }

    async fn route_click(&self, task_id: Option<String>) -> Result<ClickRoute, S::Error> {
        let target = &self.config.target_url;
        let windows = self.scope.match_all_windows(true).await?;
        debug!(count = windows.len(), "open windows");

        let Some(window) = windows.iter().find(|window| same_origin(&window.url, target)) else {
            self.scope.open_window(target).await?;
            return Ok(ClickRoute::OpenedWindow);
        };

        self.scope.focus(window).await?;
        match self.scope.navigate(window, target).await {
            Ok(()) => return Ok(ClickRoute::Navigated),
            Err(NavigateError::Unsupported) => debug!(window = %window.id, "navigate unsupported"),
            Err(NavigateError::Failed(err)) => debug!(window = %window.id, %err, "navigate failed"),
        }

        self.message_window(window, task_id)?;
        Ok(ClickRoute::Messaged)
    }

    fn message_window(&self, window: &WindowClient, task_id: Option<String>) -> Result<(), S::Error> {
        let message = ClientMessage::NotificationClick {
            task_id,
            timestamp: self.time.now_millis(),
        };
        self.scope.post_message(window, &message)
    }

    /// Processes events one at a time, replying on each envelope only after
    /// its handler has completed.
    pub async fn run(self, mut events: mpsc::Receiver<WorkerEnvelope>) {
        while let Some(envelope) = events.recv().await {
            let outcome = self.handle(envelope.event).await;
            if let Some(done) = envelope.done {
                let _ = done.send(outcome);
            }
        }
        debug!("worker event channel closed");
    }
}
