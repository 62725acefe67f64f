use crate::types::push::Subscription;

/// Failures surfaced by the subscription side of the push subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("browser lacks notification or service worker support")]
    CapabilityMissing,
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("invalid server key: {0}")]
    InvalidKeyFormat(String),
    #[error("push subscription failed: {0}")]
    SubscribeFailed(String),
    /// The browser holds the subscription but the backend has no record of it.
    #[error("subscription was not saved by the backend: {reason}")]
    BackendSyncFailed {
        subscription: Box<Subscription>,
        reason: String,
    },
}

impl PushError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PushError::CapabilityMissing => "This browser does not support notifications.",
            PushError::PermissionDenied => {
                "Notifications are blocked. Allow them in your browser settings to get task reminders."
            }
            PushError::InvalidKeyFormat(_) => {
                "Notifications are misconfigured. Please contact the administrator."
            }
            PushError::SubscribeFailed(_) => "Could not enable notifications. Please try again.",
            PushError::BackendSyncFailed { .. } => {
                "Notifications were enabled, but the server could not save them. Reminders may not arrive."
            }
        }
    }

    /// Whether an explicit user retry can succeed without a configuration change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PushError::SubscribeFailed(_) | PushError::BackendSyncFailed { .. }
        )
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::types::push::SubscriptionKeys;

    #[test]
    fn is_retryable__should_only_allow_transient_failures() {
        assert!(PushError::SubscribeFailed("push service said no".to_string()).is_retryable());
        assert!(!PushError::PermissionDenied.is_retryable());
        assert!(!PushError::CapabilityMissing.is_retryable());
        assert!(!PushError::InvalidKeyFormat("bad".to_string()).is_retryable());
    }

    fn all_errors() -> Vec<PushError> {
        vec![
            PushError::CapabilityMissing,
            PushError::PermissionDenied,
            PushError::InvalidKeyFormat("bad".to_string()),
            PushError::SubscribeFailed("push service said no".to_string()),
            PushError::BackendSyncFailed {
                subscription: Box::new(Subscription {
                    endpoint: "https://push.example/abc".to_string(),
                    expiration_time: None,
                    keys: SubscriptionKeys {
                        p256dh: "p256dh".to_string(),
                        auth: "auth".to_string(),
                    },
                }),
                reason: "503".to_string(),
            },
        ]
    }

    #[test]
    fn user_message__should_describe_every_failure() {
        for err in all_errors() {
            assert!(!err.user_message().trim().is_empty(), "{err:?}");
        }
    }

    #[test]
    fn user_message__should_point_denied_users_to_browser_settings() {
        let message = PushError::PermissionDenied.user_message();

        assert!(message.contains("browser settings"));
    }

    #[test]
    fn user_message__should_warn_when_backend_did_not_save_subscription() {
        // Given
        let err = all_errors().pop().expect("backend sync error");

        // When
        let message = err.user_message();

        // Then
        assert!(matches!(err, PushError::BackendSyncFailed { .. }));
        assert!(message.contains("may not arrive"));
    }
}
