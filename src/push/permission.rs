use tracing::{debug, info};

use crate::error::PushError;
use crate::ports::{NotificationPermissions, Permission};

/// Gates every subscription attempt on the notification permission.
#[derive(Debug, Clone)]
pub struct PermissionGate<P> {
    permissions: P,
}

impl<P: NotificationPermissions> PermissionGate<P> {
    pub fn new(permissions: P) -> Self {
        Self { permissions }
    }

    /// Current permission without prompting.
    pub fn status(&self) -> Result<Permission, PushError> {
        if !self.permissions.capabilities().supports_push() {
            return Err(PushError::CapabilityMissing);
        }
        Ok(self.permissions.permission())
    }

    /// Succeeds only once the user has granted notifications. A `Denied`
    /// answer is final for the session and is never re-requested.
    pub async fn ensure_granted(&self) -> Result<(), PushError> {
        match self.status()? {
            Permission::Granted => Ok(()),
            Permission::Denied => {
                debug!("notification permission previously denied");
                Err(PushError::PermissionDenied)
            }
            Permission::Default => {
                let answer = self.permissions.request_permission().await;
                info!(?answer, "notification permission requested");
                match answer {
                    Permission::Granted => Ok(()),
                    Permission::Denied | Permission::Default => Err(PushError::PermissionDenied),
                }
            }
        }
    }
}
