use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::ports::{TaskListView, TimeProvider, WorkerMessenger};
use crate::types::push::ClientMessage;

pub const DEFAULT_HIGHLIGHT: Duration = Duration::from_secs(3);

/// A highlight that removes itself once its timer fires.
pub struct HighlightHandle {
    pub task_id: String,
    handle: JoinHandle<()>,
}

impl HighlightHandle {
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    #[cfg(test)]
    pub(crate) async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.handle.await
    }
}

impl std::fmt::Debug for HighlightHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightHandle")
            .field("task_id", &self.task_id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[derive(Debug)]
pub enum BridgeOutcome {
    Highlighted(HighlightHandle),
    /// The referenced task is not in the list, which is not an error.
    NotFound,
    Ignored,
}

/// In-page listener for messages from the delivery worker.
pub struct ForegroundBridge<V, W, T> {
    view: V,
    worker: W,
    time: T,
    highlight_for: Duration,
    pending: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl<V, W, T> ForegroundBridge<V, W, T>
where
    V: TaskListView,
    W: WorkerMessenger,
    T: TimeProvider,
{
    pub fn new(view: V, worker: W, time: T, highlight_for: Duration) -> Self {
        Self {
            view,
            worker,
            time,
            highlight_for,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn handle(&self, message: ClientMessage) -> BridgeOutcome {
        match message {
            ClientMessage::NotificationClick { task_id, timestamp } => {
                debug!(?task_id, timestamp, "notification click received");
                self.show_task(task_id).await
            }
            ClientMessage::SkipWaiting => BridgeOutcome::Ignored,
        }
    }

    async fn show_task(&self, task_id: Option<String>) -> BridgeOutcome {
        if let Err(err) = self.view.reload().await {
            warn!(%err, "task list reload failed");
        }

        let Some(task_id) = task_id else {
            return BridgeOutcome::NotFound;
        };
        if !self.view.contains(&task_id) {
            debug!(%task_id, "clicked task is not in the list");
            return BridgeOutcome::NotFound;
        }

        self.view.set_highlight(&task_id, true);
        info!(%task_id, "highlighting task from notification");
        BridgeOutcome::Highlighted(self.schedule_unhighlight(task_id))
    }

    fn schedule_unhighlight(&self, task_id: String) -> HighlightHandle {
        let view = self.view.clone();
        let time = self.time.clone();
        let pending_timers = Arc::clone(&self.pending);
        let delay = self.highlight_for;
        let id = task_id.clone();

        // Held across spawn so the timer always finds its own entry.
        let mut pending = self.pending.lock().expect("pending highlights lock");
        let handle = tokio::spawn(async move {
            time.sleep(delay).await;
            finish_highlight(&pending_timers, &view, &id, tokio::task::id());
        });

        // A second click on the same task restarts its timer.
        if let Some(previous) = pending.insert(task_id.clone(), handle.abort_handle()) {
            previous.abort();
        }
        drop(pending);

        HighlightHandle { task_id, handle }
    }

    /// Asks a waiting worker version to take over immediately.
    pub fn activate_update(&self) -> Result<(), W::Error> {
        self.worker.post(ClientMessage::SkipWaiting)
    }

    pub async fn run(self, mut messages: mpsc::Receiver<ClientMessage>) {
        while let Some(message) = messages.recv().await {
            self.handle(message).await;
        }
    }
}

/// Clears the highlight unless a newer click has replaced this timer.
fn finish_highlight<V: TaskListView>(
    pending: &Mutex<HashMap<String, AbortHandle>>,
    view: &V,
    task_id: &str,
    timer: tokio::task::Id,
) -> bool {
    let mut pending = pending.lock().expect("pending highlights lock");
    if pending
        .get(task_id)
        .is_some_and(|current| current.id() != timer)
    {
        debug!(%task_id, "highlight timer superseded");
        return false;
    }
    pending.remove(task_id);
    view.set_highlight(task_id, false);
    true
}
