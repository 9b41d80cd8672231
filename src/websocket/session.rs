/// Per-connection WebSocket session actor
///
/// Drives the connection lifecycle: the HTTP upgrade attaches the
/// connection to the registry (Open), a `user-connected` event binds it to
/// a user (Registered), and actor shutdown detaches it (Closed). Emitted
/// notifications are bridged from the registry's channel into the socket.
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::Config;
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::websocket::messages::{ClientEvent, ServerEvent};

/// Registry emit delivered to the session actor
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct Outbound(ServerEvent);

pub struct WsSession {
    conn_id: ConnectionId,
    /// Set once the registration handshake arrives
    user_id: Option<String>,
    registry: ConnectionRegistry,
    /// Receiver half of the registry emit channel; taken when the actor starts
    inbox: Option<UnboundedReceiver<ServerEvent>>,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl WsSession {
    pub fn new(
        conn_id: ConnectionId,
        registry: ConnectionRegistry,
        inbox: UnboundedReceiver<ServerEvent>,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            conn_id,
            user_id: None,
            registry,
            inbox: Some(inbox),
            hb: Instant::now(),
            heartbeat_interval,
            client_timeout,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                tracing::warn!(conn_id = %act.conn_id, "heartbeat timed out, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn handle_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::UserConnected(user_id) => {
                tracing::info!(conn_id = %self.conn_id, user_id, "registration received");
                self.user_id = Some(user_id.clone());

                // Re-registration on the same connection simply re-executes
                // the (idempotent) register.
                let registry = self.registry.clone();
                let conn_id = self.conn_id;
                actix::spawn(async move {
                    registry.register(&user_id, conn_id).await;
                });
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(conn_id = %self.conn_id, "websocket session started");
        self.hb(ctx);

        // Bridge registry emits into the actor mailbox. The sender is
        // dropped on detach, which ends this task.
        if let Some(mut inbox) = self.inbox.take() {
            let addr = ctx.address();
            actix::spawn(async move {
                while let Some(event) = inbox.recv().await {
                    if addr.try_send(Outbound(event)).is_err() {
                        break;
                    }
                }
            });
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            conn_id = %self.conn_id,
            user_id = ?self.user_id,
            "websocket session stopped"
        );

        let registry = self.registry.clone();
        let conn_id = self.conn_id;
        actix::spawn(async move {
            registry.detach(conn_id).await;
        });
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        match msg.0.to_json() {
            Ok(json) => ctx.text(json),
            Err(e) => {
                tracing::error!(conn_id = %self.conn_id, error = %e, "failed to encode event")
            }
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                match ClientEvent::from_json(&text) {
                    Ok(event) => self.handle_client_event(event),
                    Err(e) => {
                        tracing::warn!(conn_id = %self.conn_id, error = %e, "unparseable client message");
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(conn_id = %self.conn_id, "binary messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(conn_id = %self.conn_id, ?reason, "close received");
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(conn_id = %self.conn_id, error = %e, "websocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// WebSocket upgrade handler
///
/// Endpoint: GET /ws
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<ConnectionRegistry>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    let (conn_id, inbox) = registry.attach().await;

    let session = WsSession::new(
        conn_id,
        registry.get_ref().clone(),
        inbox,
        config.websocket.heartbeat_interval(),
        config.websocket.client_timeout(),
    );

    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            // Handshake rejected: the actor never starts, so roll back the
            // attachment here.
            registry.detach(conn_id).await;
            Err(e)
        }
    }
}

/// Register the WebSocket route
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_connect));
}
