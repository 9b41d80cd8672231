/// Wire events exchanged over the notification WebSocket
use serde::{Deserialize, Serialize};

use crate::models::Notification;

/// Events sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Registration handshake carrying the client's user identifier.
    /// Sent on initial connect and after every reconnection.
    UserConnected(String),
}

/// Events sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// An administrator-originated notification
    AdminNotification(Notification),
}

impl ClientEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_event_name() {
        let event = ClientEvent::UserConnected("u1".to_string());
        let json = event.to_json().unwrap();
        assert_eq!(json, r#"{"event":"user-connected","data":"u1"}"#);
    }

    #[test]
    fn test_registration_round_trip() {
        let event = ClientEvent::UserConnected("customer-42".to_string());
        let json = event.to_json().unwrap();
        assert_eq!(ClientEvent::from_json(&json).unwrap(), event);
    }

    #[test]
    fn test_notification_event_name() {
        let event = ServerEvent::AdminNotification(Notification::new("disk quota exceeded"));
        let json = event.to_json().unwrap();
        assert!(json.contains(r#""event":"admin-notification""#));
    }

    #[test]
    fn test_notification_round_trip() {
        let event = ServerEvent::AdminNotification(Notification::new("invoice ready"));
        let json = event.to_json().unwrap();
        let decoded = ServerEvent::from_json(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(ClientEvent::from_json(r#"{"event":"unknown","data":"x"}"#).is_err());
    }
}
