pub mod backend;
pub mod browser;
pub mod storage;
pub mod time;
pub mod view;
pub mod worker;

pub use self::backend::{SubscriptionBackend, TaskApi};
pub use self::browser::{Capabilities, NotificationPermissions, Permission, PushService};
pub use self::storage::KeyValueStore;
pub use self::time::TimeProvider;
pub use self::view::TaskListView;
pub use self::worker::{NavigateError, WindowClient, WorkerMessenger, WorkerScope};
