pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod ports;
pub mod push;
pub mod tasks;
pub mod types;

pub use error::PushError;
pub use push::bridge::{BridgeOutcome, ForegroundBridge};
pub use push::key_codec::decode_server_key;
pub use push::manager::{SubscriptionManager, SubscriptionState};
pub use push::worker::{DeliveryWorker, WorkerEvent, WorkerOutcome};
