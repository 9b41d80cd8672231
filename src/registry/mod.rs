//! In-memory connection registry
//!
//! The sole piece of shared state in the delivery core: which connections
//! are currently open, and which user each one is bound to. Owned by the
//! server process and injected into the session handler and the dispatcher.
//! Everything lives behind a single lock so a disconnect and a registration
//! cannot interleave into a lost removal or a phantom entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::metrics;
use crate::websocket::ServerEvent;

/// Opaque identifier assigned to a connection at handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Default)]
struct RegistryInner {
    /// Every open connection and its outbound emit channel
    channels: HashMap<ConnectionId, UnboundedSender<ServerEvent>>,
    /// user_id -> connection id; at most one binding per user, last write wins
    bindings: HashMap<String, ConnectionId>,
    /// Reverse index (connection id -> user id), kept in lockstep with
    /// `bindings` so removal on disconnect is O(1)
    owners: HashMap<ConnectionId, String>,
}

impl RegistryInner {
    /// Drop the binding owned by `conn_id`, if any.
    ///
    /// A binding already replaced by a later registration is left alone —
    /// the replaced connection's `owners` entry was removed at register
    /// time, so this cannot clear another connection's binding.
    fn unbind(&mut self, conn_id: ConnectionId) {
        if let Some(user_id) = self.owners.remove(&conn_id) {
            if self.bindings.get(&user_id) == Some(&conn_id) {
                self.bindings.remove(&user_id);
            }
        }
    }
}

/// Registry of open connections and user bindings.
///
/// Cheap to clone; all clones share the same state. Entries are created on
/// registration and removed on the matching disconnect — nothing survives a
/// process restart.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a connection whose transport handshake has completed.
    ///
    /// Assigns the connection id and opens its emit channel. The connection
    /// is now open (it receives broadcasts) but not yet bound to a user.
    pub async fn attach(&self) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        let conn_id = ConnectionId::new();

        let mut guard = self.inner.write().await;
        guard.channels.insert(conn_id, tx);
        metrics::set_open_connections(guard.channels.len());

        tracing::debug!(%conn_id, open = guard.channels.len(), "connection attached");
        (conn_id, rx)
    }

    /// Remove a closed connection and any binding it owns.
    ///
    /// Idempotent: detaching an unknown or never-registered connection is a
    /// no-op. Dropping the emit channel ends the session's forwarding task.
    pub async fn detach(&self, conn_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        guard.channels.remove(&conn_id);
        guard.unbind(conn_id);

        metrics::set_open_connections(guard.channels.len());
        metrics::set_registered_users(guard.bindings.len());
        tracing::debug!(%conn_id, open = guard.channels.len(), "connection detached");
    }

    /// Bind `user_id` to `conn_id`, unconditionally overwriting any existing
    /// binding for that user.
    ///
    /// The replaced connection stays open — it keeps receiving broadcasts
    /// but no longer receives targeted dispatches. Re-registering the same
    /// pair is idempotent.
    pub async fn register(&self, user_id: &str, conn_id: ConnectionId) {
        let mut guard = self.inner.write().await;

        if let Some(previous) = guard.bindings.insert(user_id.to_string(), conn_id) {
            if previous != conn_id {
                guard.owners.remove(&previous);
                tracing::debug!(user_id, %previous, %conn_id, "binding replaced");
            }
        }
        if let Some(previous_user) = guard.owners.insert(conn_id, user_id.to_string()) {
            // Same connection re-registered under a different user: the old
            // user's forward entry must not dangle.
            if previous_user != user_id && guard.bindings.get(&previous_user) == Some(&conn_id) {
                guard.bindings.remove(&previous_user);
            }
        }

        metrics::set_registered_users(guard.bindings.len());
        tracing::debug!(user_id, %conn_id, "user registered");
    }

    /// Remove the binding owned by `conn_id`; no-op for unknown ids.
    pub async fn unregister(&self, conn_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        guard.unbind(conn_id);
        metrics::set_registered_users(guard.bindings.len());
    }

    /// Connection id currently bound to `user_id`, if any.
    pub async fn lookup(&self, user_id: &str) -> Option<ConnectionId> {
        let guard = self.inner.read().await;
        guard.bindings.get(user_id).copied()
    }

    /// Emit channel for the connection bound to `user_id`.
    ///
    /// Binding and channel are read under one lock, so a sender is returned
    /// only for a connection that was open at the time of the read.
    pub async fn resolve(&self, user_id: &str) -> Option<UnboundedSender<ServerEvent>> {
        let guard = self.inner.read().await;
        let conn_id = guard.bindings.get(user_id)?;
        guard.channels.get(conn_id).cloned()
    }

    /// Snapshot of every open connection's emit channel.
    pub async fn open_channels(&self) -> Vec<UnboundedSender<ServerEvent>> {
        let guard = self.inner.read().await;
        guard.channels.values().cloned().collect()
    }

    pub async fn is_connected(&self, user_id: &str) -> bool {
        self.lookup(user_id).await.is_some()
    }

    /// Number of connections currently open (registered or not).
    pub async fn open_connections(&self) -> usize {
        let guard = self.inner.read().await;
        guard.channels.len()
    }

    /// Number of users with a live binding.
    pub async fn registered_users(&self) -> usize {
        let guard = self.inner.read().await;
        guard.bindings.len()
    }
}
