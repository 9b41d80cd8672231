use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification as delivered to a connected client.
///
/// Constructed fresh at dispatch time and never persisted: a recipient
/// without a live connection simply misses it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Time-derived identifier assigned at dispatch time
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(message: &str) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            message: message.to_string(),
            timestamp: now,
            read: false,
        }
    }
}

/// Admin dispatch request body.
///
/// `user_id` present → targeted dispatch; absent → broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub message: String,
}

/// Outcome of a dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Targeted notification emitted to the bound connection
    Delivered,
    /// Broadcast emitted to every open connection observed at call time
    Broadcast { connections: usize },
    /// Target user has no live binding; the notification was dropped
    NotConnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_starts_unread() {
        let notification = Notification::new("maintenance window at 02:00");
        assert!(!notification.read);
        assert_eq!(notification.message, "maintenance window at 02:00");
        assert!(!notification.id.is_empty());
    }

    #[test]
    fn test_notification_id_is_time_derived() {
        let notification = Notification::new("hello");
        let millis: i64 = notification.id.parse().unwrap();
        assert_eq!(millis, notification.timestamp.timestamp_millis());
    }

    #[test]
    fn test_notification_serializes_camel_case() {
        let notification = Notification::new("hello");
        let json = serde_json::to_value(&notification).unwrap();
        assert!(json.get("id").is_some());
        assert!(json.get("message").is_some());
        assert!(json.get("timestamp").is_some());
        assert_eq!(json.get("read").unwrap(), false);
    }

    #[test]
    fn test_dispatch_request_user_id_optional() {
        let targeted: DispatchRequest =
            serde_json::from_str(r#"{"userId": "u1", "message": "hi"}"#).unwrap();
        assert_eq!(targeted.user_id.as_deref(), Some("u1"));

        let broadcast: DispatchRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert!(broadcast.user_id.is_none());
    }
}
