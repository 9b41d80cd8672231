//! Notification dispatcher
//!
//! Resolves dispatch requests against the registry and emits notification
//! events to the matching connection(s). Delivery is best effort and
//! at-most-once: nothing is queued, retried, or acknowledged.

use crate::error::Result;
use crate::metrics;
use crate::models::{DispatchOutcome, Notification};
use crate::registry::ConnectionRegistry;
use crate::websocket::ServerEvent;

#[derive(Clone)]
pub struct Dispatcher {
    registry: ConnectionRegistry,
}

impl Dispatcher {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Dispatch a notification.
    ///
    /// With a target user id, emits one notification event to that user's
    /// bound connection, or reports `NotConnected` and drops the
    /// notification. Without one, broadcasts to every open connection and
    /// reports the count observed at call time.
    ///
    /// Emits are fire-and-forget: a channel send error means the connection
    /// closed between the registry read and the send, and the disconnect
    /// path has already cleaned up.
    pub async fn dispatch(
        &self,
        target_user_id: Option<&str>,
        message: &str,
    ) -> Result<DispatchOutcome> {
        let notification = Notification::new(message);

        match target_user_id {
            Some(user_id) => match self.registry.resolve(user_id).await {
                Some(channel) => {
                    let _ = channel.send(ServerEvent::AdminNotification(notification));
                    metrics::record_dispatch("targeted", "delivered");
                    tracing::info!(user_id, "notification delivered");
                    Ok(DispatchOutcome::Delivered)
                }
                None => {
                    metrics::record_dispatch("targeted", "not_connected");
                    tracing::info!(user_id, "target not connected, notification dropped");
                    Ok(DispatchOutcome::NotConnected)
                }
            },
            None => {
                let channels = self.registry.open_channels().await;
                let connections = channels.len();

                for channel in &channels {
                    let _ = channel.send(ServerEvent::AdminNotification(notification.clone()));
                }

                metrics::record_dispatch("broadcast", "delivered");
                tracing::info!(connections, "notification broadcast");
                Ok(DispatchOutcome::Broadcast { connections })
            }
        }
    }
}
