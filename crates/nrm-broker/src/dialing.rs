//! Client-side transport: dials out to a listening controller, the way
//! `UplinkSession` in the teacher's forwarder dials out to its server.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, warn};

use nrm_proto::{unpack_pub, unpack_rpc, pack_rpc, PubFrame, RpcFrame, WsMessage};

use crate::command::{BrokerCallbacks, BrokerCommand};
use crate::error::BrokerError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// First frame sent on a dialed sub connection: narrows the fanout to
/// topics with this prefix. An empty prefix subscribes to everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub topic_prefix: String,
}

async fn connect(url: &str, token: Option<&str>) -> Result<WsStream, BrokerError> {
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let mut request = url
        .into_client_request()
        .map_err(|e| BrokerError::Connect(format!("invalid url '{url}': {e}")))?;

    if let Some(token) = token {
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {token}")
                .parse()
                .map_err(|e| BrokerError::Connect(format!("invalid auth header: {e}")))?,
        );
    }

    let (ws, _response) = connect_async(request)
        .await
        .map_err(|e| BrokerError::Connect(e.to_string()))?;
    Ok(ws)
}

async fn send_rpc_frame(ws: &mut WsStream, frame: &RpcFrame) -> Result<(), BrokerError> {
    let json = pack_rpc(frame)?;
    ws.send(Message::Text(json.into()))
        .await
        .map_err(|e| BrokerError::Ws(e.to_string()))
}

async fn recv_rpc_frame(ws: &mut WsStream) -> Result<RpcFrame, BrokerError> {
    loop {
        match ws.next().await {
            None => return Err(BrokerError::Disconnected),
            Some(Err(e)) => return Err(BrokerError::Ws(e.to_string())),
            Some(Ok(Message::Text(text))) => return Ok(unpack_rpc(&text)?),
            Some(Ok(Message::Close(_))) => return Err(BrokerError::Disconnected),
            Some(Ok(Message::Ping(data))) => {
                let _ = ws.send(Message::Pong(data)).await;
            }
            Some(Ok(_)) => continue,
        }
    }
}

/// A dialed RPC connection: every command sent is matched by exactly one
/// reply frame from the controller before the next is sent. Unsolicited
/// command frames (TICK, ACTUATE) are handed off to `callbacks.on_command`
/// instead of being mistaken for a pending reply.
///
/// The socket is read continuously, not just while a `SendRpc` is
/// outstanding: an idle connection still needs to observe a server-pushed
/// command the moment it arrives, rather than only the next time the
/// caller happens to issue a request.
pub async fn run_rpc(
    url: String,
    token: Option<String>,
    mut commands: mpsc::Receiver<BrokerCommand>,
    callbacks: BrokerCallbacks,
) -> Result<(), BrokerError> {
    let mut ws = connect(&url, token.as_deref()).await?;

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(BrokerCommand::SendRpc { request, reply }) => {
                        let frame = RpcFrame { routing_id: None, payload: request };
                        if let Err(e) = send_rpc_frame(&mut ws, &frame).await {
                            let _ = reply.send(Err(e));
                            continue;
                        }
                        let outcome = recv_matching_reply(&mut ws, &callbacks).await;
                        let _ = reply.send(outcome);
                    }
                    Some(BrokerCommand::Publish(_)) => {
                        warn!("publish requested on an rpc-only dialed connection, ignoring");
                    }
                    Some(BrokerCommand::Subscribe(_)) => {
                        warn!("subscribe requested on an rpc-only dialed connection, ignoring");
                    }
                    Some(BrokerCommand::Terminate) | None => break,
                }
            }
            frame = recv_rpc_frame(&mut ws) => {
                let frame = frame?;
                if frame.payload.is_command() {
                    debug!("unsolicited command frame received while idle, handing off to callback");
                    let _ = callbacks.on_command.send(frame.payload).await;
                } else {
                    debug!("dropping unmatched rpc reply received while idle");
                }
            }
        }
    }
    let _ = ws.close(None).await;
    Ok(())
}

async fn recv_matching_reply(
    ws: &mut WsStream,
    callbacks: &BrokerCallbacks,
) -> Result<WsMessage, BrokerError> {
    loop {
        let frame = recv_rpc_frame(ws).await?;
        if frame.payload.is_command() {
            debug!("unsolicited command frame, handing off to callback");
            let _ = callbacks.on_command.send(frame.payload).await;
            continue;
        }
        return Ok(frame.payload);
    }
}

/// A dialed sub connection: sends one `SubscribeRequest`, then forwards
/// every `PubFrame` the controller publishes to `callbacks.on_pub` until
/// terminated.
pub async fn run_sub(
    url: String,
    token: Option<String>,
    topic_prefix: String,
    mut commands: mpsc::Receiver<BrokerCommand>,
    callbacks: BrokerCallbacks,
) -> Result<(), BrokerError> {
    let mut ws = connect(&url, token.as_deref()).await?;
    let sub = serde_json::to_string(&SubscribeRequest { topic_prefix })
        .map_err(|e| BrokerError::Protocol(e.to_string()))?;
    ws.send(Message::Text(sub.into()))
        .await
        .map_err(|e| BrokerError::Ws(e.to_string()))?;

    loop {
        tokio::select! {
            msg = ws.next() => {
                match msg {
                    None => return Ok(()),
                    Some(Err(e)) => return Err(BrokerError::Ws(e.to_string())),
                    Some(Ok(Message::Text(text))) => {
                        let frame: PubFrame = unpack_pub(&text)?;
                        let _ = callbacks.on_pub.send(frame).await;
                    }
                    Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws.send(Message::Pong(data)).await;
                    }
                    Some(Ok(_)) => continue,
                }
            }
            cmd = commands.recv() => {
                match cmd {
                    Some(BrokerCommand::Terminate) | None => {
                        let _ = ws.close(None).await;
                        return Ok(());
                    }
                    _ => warn!("ignoring non-terminate command on sub connection"),
                }
            }
        }
    }
}
