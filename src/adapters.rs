use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::mpsc;

use crate::ports;
use crate::push::worker::{WorkerEnvelope, WorkerEvent};
use crate::types::push::ClientMessage;

mod http;
mod store;

pub use http::{BackendError, HttpBackend};
pub use store::{FileStore, MemoryStore, StoreError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("delivery worker is not running")]
pub struct WorkerGone;

/// Window-side handle onto a running [`crate::push::worker::DeliveryWorker`].
#[derive(Debug, Clone)]
pub struct ChannelMessenger {
    sender: mpsc::Sender<WorkerEnvelope>,
}

impl ChannelMessenger {
    pub fn new(sender: mpsc::Sender<WorkerEnvelope>) -> Self {
        Self { sender }
    }
}

impl ports::WorkerMessenger for ChannelMessenger {
    type Error = WorkerGone;

    fn post(&self, message: ClientMessage) -> Result<(), Self::Error> {
        let envelope = WorkerEnvelope {
            event: WorkerEvent::Message(message),
            done: None,
        };
        self.sender.try_send(envelope).map_err(|_| WorkerGone)
    }
}
