use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A push subscription as issued by the browser's push service.
///
/// Serializes to the same shape as `PushSubscription.toJSON()`, which is what
/// the backend's `/api/push/subscribe` endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Options handed to `pushManager.subscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: Value,
    pub actions: Vec<NotificationAction>,
}

/// A system notification ready to be shown by the delivery worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayNotification {
    pub title: String,
    pub options: NotificationOptions,
}

/// A notification the browser has shown, as seen by click and close events.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownNotification {
    pub tag: String,
    pub data: Value,
}

impl ShownNotification {
    /// The task referenced by the notification's data bag, if any.
    ///
    /// Senders emit the id as a string, but numeric ids are accepted too.
    pub fn task_id(&self) -> Option<String> {
        match self.data.get("taskId")? {
            Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Messages exchanged between the delivery worker and application windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    NotificationClick {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default)]
        timestamp: i64,
    },
    SkipWaiting,
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_message__should_use_wire_tags() {
        // Given
        let click = ClientMessage::NotificationClick {
            task_id: Some("42".to_string()),
            timestamp: 1_700_000_000_000,
        };

        // When
        let click_json = serde_json::to_value(&click).expect("serialize click");
        let skip_json = serde_json::to_value(ClientMessage::SkipWaiting).expect("serialize skip");

        // Then
        assert_eq!(
            click_json,
            json!({"type": "NOTIFICATION_CLICK", "taskId": "42", "timestamp": 1_700_000_000_000i64})
        );
        assert_eq!(skip_json, json!({"type": "SKIP_WAITING"}));
    }

    #[test]
    fn client_message__should_accept_click_without_task_id() {
        let message: ClientMessage =
            serde_json::from_value(json!({"type": "NOTIFICATION_CLICK"})).expect("parse");

        assert_eq!(
            message,
            ClientMessage::NotificationClick {
                task_id: None,
                timestamp: 0
            }
        );
    }

    #[test]
    fn subscription__should_match_browser_json_shape() {
        // Given
        let raw = json!({
            "endpoint": "https://push.example/abc",
            "expirationTime": null,
            "keys": {"p256dh": "p256", "auth": "secret"}
        });

        // When
        let subscription: Subscription = serde_json::from_value(raw.clone()).expect("parse");

        // Then
        assert_eq!(subscription.endpoint, "https://push.example/abc");
        assert_eq!(subscription.keys.auth, "secret");
        assert_eq!(serde_json::to_value(&subscription).expect("serialize"), raw);
    }

    #[test]
    fn task_id__should_read_string_and_numeric_ids() {
        let as_string = ShownNotification {
            tag: "n1".to_string(),
            data: json!({"taskId": "42"}),
        };
        let as_number = ShownNotification {
            tag: "n2".to_string(),
            data: json!({"taskId": 7}),
        };
        let missing = ShownNotification {
            tag: "n3".to_string(),
            data: json!({"dateOfArrival": 1, "primaryKey": 1}),
        };

        assert_eq!(as_string.task_id().as_deref(), Some("42"));
        assert_eq!(as_number.task_id().as_deref(), Some("7"));
        assert_eq!(missing.task_id(), None);
    }
}
