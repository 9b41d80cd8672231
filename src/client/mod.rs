//! Client session agent
//!
//! Consumer-side counterpart of the delivery core: keeps one connection to
//! the server's `/ws` endpoint alive, performs the registration handshake
//! after every (re)connection, and records inbound notifications newest
//! first. The registry forgets bindings when a connection drops, so the
//! handshake must be re-sent on every reconnect, not only the first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::models::Notification;
use crate::websocket::{ClientEvent, ServerEvent};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SessionAgentConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:8000/ws`
    pub url: String,
    /// User identifier sent in the registration handshake
    pub user_id: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl SessionAgentConfig {
    pub fn new(url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_id: user_id.into(),
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

#[derive(Default)]
struct AgentState {
    connected: AtomicBool,
    /// Newest first
    notifications: RwLock<Vec<Notification>>,
}

impl AgentState {
    async fn record(&self, event: ServerEvent) {
        match event {
            ServerEvent::AdminNotification(notification) => {
                tracing::debug!(id = %notification.id, "notification received");
                self.notifications.write().await.insert(0, notification);
            }
        }
    }
}

/// Handle to a running session agent.
pub struct SessionAgent {
    state: Arc<AgentState>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionAgent {
    /// Spawn the connection loop. Returns immediately; connectivity is
    /// reported through [`SessionAgent::is_connected`].
    pub fn connect(config: SessionAgentConfig) -> Self {
        let state = Arc::new(AgentState::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(config, Arc::clone(&state), shutdown_rx));

        Self {
            state,
            shutdown_tx,
            task,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Relaxed)
    }

    /// Snapshot of received notifications, newest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.notifications.read().await.clone()
    }

    /// Close the connection and stop the agent.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

async fn run_loop(
    config: SessionAgentConfig,
    state: Arc<AgentState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = config.initial_backoff;

    loop {
        if *shutdown.borrow() {
            return;
        }

        match connect_async(config.url.as_str()).await {
            Ok((stream, _)) => {
                backoff = config.initial_backoff;
                state.connected.store(true, Ordering::Relaxed);
                tracing::info!(url = %config.url, "connected");

                let clean = drive_session(stream, &config, &state, &mut shutdown).await;
                state.connected.store(false, Ordering::Relaxed);

                match clean {
                    Ok(()) => return,
                    Err(e) => tracing::warn!(error = %e, "session ended"),
                }
            }
            Err(e) => {
                tracing::warn!(url = %config.url, error = %e, "connect failed");
            }
        }

        tracing::info!("reconnecting in {:?}", backoff);
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = shutdown.changed() => return,
        }
        backoff = next_backoff(backoff, config.max_backoff);
    }
}

/// Run one established session to completion.
///
/// Ok means shutdown was requested; Err means the session was lost and the
/// caller should reconnect.
async fn drive_session(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    config: &SessionAgentConfig,
    state: &AgentState,
    shutdown: &mut watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let (mut sink, mut source) = stream.split();

    // Registration handshake, required after every reconnection because the
    // server forgot the previous connection's binding.
    let registration = ClientEvent::UserConnected(config.user_id.clone()).to_json()?;
    sink.send(Message::Text(registration.into())).await?;
    tracing::debug!(user_id = %config.user_id, "registration sent");

    loop {
        tokio::select! {
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => match ServerEvent::from_json(text.as_str()) {
                    Ok(event) => state.record(event).await,
                    Err(e) => tracing::warn!(error = %e, "unparseable server message"),
                },
                Some(Ok(Message::Ping(payload))) => {
                    sink.send(Message::Pong(payload)).await?;
                }
                Some(Ok(Message::Close(reason))) => {
                    tracing::info!(?reason, "server closed connection");
                    return Err(anyhow!("connection closed by server"));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(anyhow!("connection stream ended")),
            },
            _ = shutdown.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return Ok(());
            }
        }
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}
