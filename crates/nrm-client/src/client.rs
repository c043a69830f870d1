use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, mpsc, Mutex};
use uuid::Uuid;

use nrm_broker::{BrokerCallbacks, BrokerHandle, Role};
use nrm_proto::{
    ActuateMsg, ActuatorInfo, AddBody, AddRequest, AddedEntity, EntityList, EventMsg, FindQuery,
    ListRequest, RemoveRequest, ScopeInfo, ScopeSpec, SensorInfo, SliceInfo, TargetType, WsMessage,
};

use crate::error::ClientError;

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// A connection to the daemon's RPC and pub/sub endpoints, playing either
/// the `Client` or `Sensor` role. Every public method sends one request and
/// awaits its matching reply; unsolicited server-pushed ACTUATE commands are
/// fanned out to listeners started with [`Client::start_actuate_listener`].
pub struct Client {
    role: Role,
    rpc: BrokerHandle,
    events: Mutex<Option<BrokerHandle>>,
    pub_url: String,
    token: Option<String>,
    actuate_tx: broadcast::Sender<ActuateMsg>,
}

impl Client {
    /// Dials the controller's RPC endpoint at `rpc_url` and records
    /// `pub_url` for later use by [`Client::start_event_listener`]. The
    /// transport is two sockets — clients dial both.
    pub fn connect(
        rpc_url: impl Into<String>,
        pub_url: impl Into<String>,
        token: Option<String>,
        role: Role,
    ) -> Self {
        let (on_command, mut on_command_rx) = mpsc::channel(64);
        // The RPC connection never produces pub/sub traffic; this receiver
        // is simply dropped.
        let (on_pub, _on_pub_rx) = mpsc::channel(1);
        let callbacks = BrokerCallbacks { on_command, on_pub };
        let rpc = BrokerHandle::dial_rpc(format!("{}/rpc", rpc_url.into()), token.clone(), callbacks);

        let (actuate_tx, _actuate_rx) = broadcast::channel(64);
        let fanout = actuate_tx.clone();
        tokio::spawn(async move {
            while let Some(msg) = on_command_rx.recv().await {
                if let WsMessage::Actuate(actuate) = msg {
                    let _ = fanout.send(actuate);
                }
            }
        });

        Client {
            role,
            rpc,
            events: Mutex::new(None),
            pub_url: pub_url.into(),
            token,
            actuate_tx,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    async fn request(&self, msg: WsMessage) -> Result<WsMessage, ClientError> {
        let reply = self.rpc.send_rpc(msg).await?;
        if let WsMessage::Nak(nak) = reply {
            return Err(ClientError::Rejected(nak.reason));
        }
        Ok(reply)
    }

    pub async fn add_sensor(&self, name: impl Into<String>) -> Result<SensorInfo, ClientError> {
        let req = WsMessage::Add(AddRequest {
            body: AddBody::Sensor(nrm_proto::SensorSpec { name: name.into() }),
        });
        match self.request(req).await? {
            WsMessage::AddReply(AddedEntity::Sensor(info)) => Ok(info),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn add_slice(&self, name: impl Into<String>) -> Result<SliceInfo, ClientError> {
        let req = WsMessage::Add(AddRequest {
            body: AddBody::Slice(nrm_proto::SliceSpec { name: name.into() }),
        });
        match self.request(req).await? {
            WsMessage::AddReply(AddedEntity::Slice(info)) => Ok(info),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn add_scope(&self, spec: ScopeSpec) -> Result<ScopeInfo, ClientError> {
        let req = WsMessage::Add(AddRequest { body: AddBody::Scope(spec) });
        match self.request(req).await? {
            WsMessage::AddReply(AddedEntity::Scope(info)) => Ok(info),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn add_actuator(
        &self,
        name: impl Into<String>,
        kind: nrm_proto::ActuatorKindSpec,
        initial_value: f64,
    ) -> Result<ActuatorInfo, ClientError> {
        let req = WsMessage::Add(AddRequest {
            body: AddBody::Actuator(nrm_proto::ActuatorSpec {
                name: name.into(),
                kind,
                initial_value,
            }),
        });
        match self.request(req).await? {
            WsMessage::AddReply(AddedEntity::Actuator(info)) => Ok(info),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn remove(&self, target: TargetType, uuid: Uuid) -> Result<(), ClientError> {
        let req = WsMessage::Remove(RemoveRequest { target, uuid });
        match self.request(req).await? {
            WsMessage::Ack => Ok(()),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn list(
        &self,
        target: TargetType,
        filter: Option<FindQuery>,
    ) -> Result<EntityList, ClientError> {
        let req = WsMessage::List(ListRequest { target, filter });
        match self.request(req).await? {
            WsMessage::ListReply(list) => Ok(list),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn find_by_name(
        &self,
        target: TargetType,
        name: impl Into<String>,
    ) -> Result<EntityList, ClientError> {
        self.list(target, Some(FindQuery::Name(name.into()))).await
    }

    pub async fn actuate(&self, actuator_uuid: Uuid, value: f64) -> Result<(), ClientError> {
        let req = WsMessage::Actuate(ActuateMsg { actuator_uuid, value });
        match self.request(req).await? {
            WsMessage::Ack => Ok(()),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn send_event(
        &self,
        sensor_uuid: Uuid,
        scope: ScopeSpec,
        value: f64,
    ) -> Result<(), ClientError> {
        let req = WsMessage::Event(EventMsg { sensor_uuid, scope, time_ns: now_ns(), value });
        match self.request(req).await? {
            WsMessage::Ack => Ok(()),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn send_exit(&self) -> Result<(), ClientError> {
        match self.request(WsMessage::Exit).await? {
            WsMessage::Ack => Ok(()),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    /// Dials a separate sub connection filtered to `topic_prefix` and spawns
    /// a task that forwards every received frame to `on_event`. Calling
    /// this again replaces the previous subscription.
    pub async fn start_event_listener(
        self: &Arc<Self>,
        topic_prefix: impl Into<String>,
        on_event: mpsc::Sender<WsMessage>,
    ) {
        // A sub connection never receives unsolicited RPC-side commands;
        // this sender's receiver is simply dropped.
        let (on_command, _on_command_rx) = mpsc::channel(1);
        let (pub_tx, mut pub_rx) = mpsc::channel(256);
        let callbacks = BrokerCallbacks { on_command, on_pub: pub_tx };
        let handle = BrokerHandle::dial_sub(
            format!("{}/sub", self.pub_url),
            self.token.clone(),
            topic_prefix,
            callbacks,
        );
        tokio::spawn(async move {
            while let Some(frame) = pub_rx.recv().await {
                if on_event.send(frame.payload).await.is_err() {
                    return;
                }
            }
        });
        *self.events.lock().await = Some(handle);
    }

    /// Wires the cmd callback channel's unsolicited ACTUATE frames to
    /// `on_actuate`, carrying `(actuator_uuid, value)`. Each call starts an
    /// independent broadcast subscriber, so multiple listeners can coexist.
    pub fn start_actuate_listener(&self, on_actuate: mpsc::Sender<ActuateMsg>) {
        let mut rx = self.actuate_tx.subscribe();
        tokio::spawn(async move {
            while let Ok(msg) = rx.recv().await {
                if on_actuate.send(msg).await.is_err() {
                    return;
                }
            }
        });
    }

    /// Tears down both the RPC connection and any active sub connection.
    pub async fn disconnect(self) -> Result<(), ClientError> {
        if let Some(handle) = self.events.into_inner() {
            handle.terminate().await?;
        }
        self.rpc.terminate().await?;
        Ok(())
    }
}
