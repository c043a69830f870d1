//! Controller-side transport: accepts dialed-in RPC and sub connections,
//! the way the teacher's `ws_forwarder_handler` accepts forwarder uplinks.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use nrm_proto::{unpack_rpc, pack_pub, pack_rpc, PubFrame, RpcFrame, WsMessage};

use crate::dialing::SubscribeRequest;

/// Invoked once per inbound RPC request with a stable per-connection
/// identity and the request payload; returns the reply payload to send
/// back. The identity is the same for every request sent over one
/// connection and is used as an actuator's owning `clientid`. Lives behind
/// an `Arc` so it can be shared across every accepted connection.
pub type RpcHandler = Arc<
    dyn Fn(Uuid, WsMessage) -> futures_util::future::BoxFuture<'static, WsMessage> + Send + Sync,
>;

/// The publish side of the controller, independent of the RPC handler: can
/// be constructed and handed to the dispatcher before the handler closure
/// (which typically closes over the dispatcher) exists.
#[derive(Clone)]
pub struct Publisher(broadcast::Sender<PubFrame>);

impl Publisher {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        Publisher(tx)
    }

    /// Fans a message out to every connected subscriber whose prefix
    /// matches `topic`. Delivery is best-effort: a lagging subscriber that
    /// misses messages is not retried, matching the pub/sub socket's
    /// fire-and-forget semantics.
    pub fn publish(&self, topic: impl Into<String>, payload: WsMessage) {
        let frame = PubFrame { topic: topic.into(), payload };
        let _ = self.0.send(frame);
    }

    fn subscribe(&self) -> broadcast::Receiver<PubFrame> {
        self.0.subscribe()
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Publisher::new()
    }
}

/// Tracks live RPC connections by the same connection identity `RpcHandler`
/// sees on every request, so the controller can push an unsolicited message
/// (an ACTUATE confirmation) to one specific connection instead of fanning
/// it out to every subscriber the way `Publisher` does.
#[derive(Clone, Default)]
pub struct RpcRegistry(Arc<RwLock<HashMap<Uuid, mpsc::Sender<WsMessage>>>>);

impl RpcRegistry {
    pub fn new() -> Self {
        RpcRegistry::default()
    }

    /// Registers a connection and returns the receiving end of its push
    /// channel. Called once per accepted RPC socket.
    pub async fn register(&self, connection_id: Uuid) -> mpsc::Receiver<WsMessage> {
        let (tx, rx) = mpsc::channel(32);
        self.0.write().await.insert(connection_id, tx);
        rx
    }

    pub async fn unregister(&self, connection_id: Uuid) {
        self.0.write().await.remove(&connection_id);
    }

    /// Pushes `payload` to `connection_id`'s RPC socket. Silently dropped if
    /// that connection isn't currently live, matching the pub/sub socket's
    /// best-effort delivery.
    pub async fn push(&self, connection_id: Uuid, payload: WsMessage) {
        let tx = self.0.read().await.get(&connection_id).cloned();
        if let Some(tx) = tx {
            let _ = tx.send(payload).await;
        }
    }
}

#[derive(Clone)]
pub struct ListeningState {
    pub rpc_handler: RpcHandler,
    pub publisher: Publisher,
    pub rpc_registry: RpcRegistry,
}

impl ListeningState {
    pub fn new(rpc_handler: RpcHandler, publisher: Publisher, rpc_registry: RpcRegistry) -> Self {
        ListeningState { rpc_handler, publisher, rpc_registry }
    }

    pub fn publish(&self, topic: impl Into<String>, payload: WsMessage) {
        self.publisher.publish(topic, payload);
    }
}

/// Router for the RPC endpoint, served on the configured RPC port.
pub fn rpc_router(state: ListeningState) -> Router {
    Router::new().route("/rpc", get(rpc_handler)).with_state(state)
}

/// Router for the pub/sub endpoint, served on the configured pub/sub port.
pub fn pub_router(state: ListeningState) -> Router {
    Router::new().route("/sub", get(sub_handler)).with_state(state)
}

async fn rpc_handler(ws: WebSocketUpgrade, State(state): State<ListeningState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_rpc_socket(socket, state))
}

async fn handle_rpc_socket(mut socket: WebSocket, state: ListeningState) {
    let connection_id = Uuid::new_v4();
    let mut pushes = state.rpc_registry.register(connection_id).await;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let text = match msg {
                    Some(Ok(Message::Text(t))) => t,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("rpc connection closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = socket.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "rpc socket error");
                        break;
                    }
                };

                let frame: RpcFrame = match unpack_rpc(&text) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, "malformed rpc frame, dropping connection");
                        break;
                    }
                };

                let reply_payload = (state.rpc_handler)(connection_id, frame.payload).await;
                let reply = RpcFrame { routing_id: frame.routing_id, payload: reply_payload };
                let Ok(json) = pack_rpc(&reply) else { break };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            pushed = pushes.recv() => {
                match pushed {
                    Some(payload) => {
                        let frame = RpcFrame { routing_id: None, payload };
                        let Ok(json) = pack_rpc(&frame) else { continue };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    state.rpc_registry.unregister(connection_id).await;
}

async fn sub_handler(ws: WebSocketUpgrade, State(state): State<ListeningState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_sub_socket(socket, state))
}

async fn handle_sub_socket(mut socket: WebSocket, state: ListeningState) {
    let topic_prefix = match socket.recv().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<SubscribeRequest>(&text) {
            Ok(req) => req.topic_prefix,
            Err(_) => String::new(),
        },
        _ => {
            warn!("sub connection closed before sending a subscribe request");
            return;
        }
    };

    let mut rx = state.publisher.subscribe();
    let (tx, mut outgoing) = mpsc::channel::<PubFrame>(256);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) if frame.topic.starts_with(&topic_prefix) => {
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    });

    loop {
        tokio::select! {
            frame = outgoing.recv() => {
                match frame {
                    Some(frame) => {
                        let Ok(json) = pack_pub(&frame) else { continue };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(Message::Ping(data))) => { let _ = socket.send(Message::Pong(data)).await; }
                    _ => continue,
                }
            }
        }
    }
}
