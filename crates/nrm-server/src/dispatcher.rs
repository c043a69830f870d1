use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use nrm_broker::{Publisher, RpcRegistry};
use nrm_core::{Actuator, ActuatorError, ActuatorKind, DaemonState, EventBase, NrmTime, Scope, StateError};
use nrm_proto::{
    AddBody, AddRequest, ActuateMsg, ActuatorInfo, AddedEntity, EntityList, EventMsg, EventsMsg,
    FindQuery, ListRequest, NakMsg, RemoveRequest, ScopeInfo, SeriesSnapshot, SensorInfo,
    SliceInfo, TargetType, WsMessage,
};

use crate::callbacks::ServerCallbacks;
use crate::config::ServerConfig;

/// Ties the entity registry and event base to the wire protocol: one
/// `handle` call per inbound RPC request, and a `tick` call on a timer to
/// close the current measurement window and publish it.
pub struct Server {
    state: Arc<DaemonState>,
    eventbase: Mutex<EventBase>,
    publisher: Publisher,
    rpc_registry: RpcRegistry,
    callbacks: ServerCallbacks,
    rate_limit: Duration,
    transmit: bool,
    last_event_ns: Mutex<HashMap<Uuid, u64>>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    pub fn new(
        config: &ServerConfig,
        publisher: Publisher,
        rpc_registry: RpcRegistry,
        callbacks: ServerCallbacks,
    ) -> Arc<Self> {
        Arc::new(Server {
            state: DaemonState::new(),
            eventbase: Mutex::new(EventBase::new(config.max_events, config.max_periods)),
            publisher,
            rpc_registry,
            callbacks,
            rate_limit: config.rate_limit,
            transmit: config.transmit,
            last_event_ns: Mutex::new(HashMap::new()),
            shutdown: watch::channel(false).0,
        })
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// True if the default behavior (exit) should run for a received
    /// termination signal. False if a user-supplied `signal` hook vetoed it.
    pub fn should_exit_on_signal(&self) -> bool {
        self.callbacks.signal.as_ref().map_or(true, |hook| hook())
    }

    /// Handles one inbound request and returns the reply to send back.
    /// `connection_id` is stable for the lifetime of the connection and is
    /// recorded as the `clientid` of any actuator the request registers.
    pub async fn handle(&self, connection_id: Uuid, request: WsMessage) -> WsMessage {
        match request {
            WsMessage::Add(req) => self.handle_add(connection_id, req).await,
            WsMessage::Remove(req) => self.handle_remove(req).await,
            WsMessage::List(req) => self.handle_list(req).await,
            WsMessage::Event(msg) => self.handle_event(msg).await,
            WsMessage::Actuate(msg) => self.handle_actuate(msg).await,
            WsMessage::Exit => {
                info!("exit requested, signalling shutdown");
                let _ = self.shutdown.send(true);
                WsMessage::Ack
            }
            other => {
                warn!(?other, "message kind not handled by the dispatcher");
                WsMessage::Nak(NakMsg {
                    reason: "unsupported request kind".to_owned(),
                })
            }
        }
    }

    async fn handle_add(&self, connection_id: Uuid, req: AddRequest) -> WsMessage {
        match req.body {
            AddBody::Sensor(spec) => {
                let sensor = self.state.add_sensor(spec.name).await;
                self.eventbase.lock().await.add_sensor(sensor.uuid);
                WsMessage::AddReply(AddedEntity::Sensor(SensorInfo {
                    uuid: sensor.uuid,
                    name: sensor.name.to_string(),
                }))
            }
            AddBody::Slice(spec) => {
                let slice = self.state.add_slice(spec.name).await;
                WsMessage::AddReply(AddedEntity::Slice(SliceInfo {
                    uuid: slice.uuid,
                    name: slice.name.to_string(),
                }))
            }
            AddBody::Scope(spec) => {
                let scope = Scope::from_spec(&spec);
                let uuid = self.state.add_scope(scope.clone()).await;
                WsMessage::AddReply(AddedEntity::Scope(ScopeInfo {
                    uuid,
                    name: scope.name.to_string(),
                    cpu: scope.cpu.to_indices(),
                    numa: scope.numa.to_indices(),
                    gpu: scope.gpu.to_indices(),
                }))
            }
            AddBody::Actuator(spec) => {
                let kind = ActuatorKind::from_spec(&spec.kind);
                match Actuator::new(
                    Uuid::new_v4(),
                    spec.name,
                    kind,
                    spec.initial_value,
                    connection_id,
                ) {
                    Ok(actuator) => {
                        let info = actuator_info(&actuator);
                        self.state.add_actuator(actuator).await;
                        WsMessage::AddReply(AddedEntity::Actuator(info))
                    }
                    Err(e) => WsMessage::Nak(NakMsg { reason: e.to_string() }),
                }
            }
        }
    }

    async fn handle_remove(&self, req: RemoveRequest) -> WsMessage {
        if req.target == TargetType::Scope {
            if let Some(scope) = self.state.find_scope(req.uuid).await {
                if self.eventbase.lock().await.scope_in_use(&scope) {
                    return WsMessage::Nak(NakMsg {
                        reason: format!("scope {} is still referenced by the event base", req.uuid),
                    });
                }
            }
        }
        let result = match req.target {
            TargetType::Sensor => self.state.remove_sensor(req.uuid).await.map(|_| ()),
            TargetType::Slice => self.state.remove_slice(req.uuid).await.map(|_| ()),
            TargetType::Scope => self.state.remove_scope(req.uuid).await.map(|_| ()),
            TargetType::Actuator => self.state.remove_actuator(req.uuid).await.map(|_| ()),
        };
        match result {
            Ok(()) => {
                if req.target == TargetType::Sensor {
                    self.eventbase.lock().await.remove_sensor(req.uuid);
                }
                WsMessage::Ack
            }
            Err(e) => WsMessage::Nak(NakMsg { reason: e.to_string() }),
        }
    }

    async fn handle_list(&self, req: ListRequest) -> WsMessage {
        let list = match req.target {
            TargetType::Sensor => {
                let mut sensors = self.state.list_sensors().await;
                apply_filter(&mut sensors, &req.filter, |s| (s.uuid, s.name.as_str().to_owned()));
                EntityList::Sensor(
                    sensors
                        .into_iter()
                        .map(|s| SensorInfo { uuid: s.uuid, name: s.name.to_string() })
                        .collect(),
                )
            }
            TargetType::Slice => {
                let mut slices = self.state.list_slices().await;
                apply_filter(&mut slices, &req.filter, |s| (s.uuid, s.name.as_str().to_owned()));
                EntityList::Slice(
                    slices
                        .into_iter()
                        .map(|s| SliceInfo { uuid: s.uuid, name: s.name.to_string() })
                        .collect(),
                )
            }
            TargetType::Scope => {
                let mut scopes = self.state.list_scopes().await;
                apply_filter(&mut scopes, &req.filter, |s| {
                    (s.uuid.unwrap_or(Uuid::nil()), s.name.as_str().to_owned())
                });
                EntityList::Scope(
                    scopes
                        .into_iter()
                        .map(|s| ScopeInfo {
                            uuid: s.uuid.unwrap_or(Uuid::nil()),
                            name: s.name.to_string(),
                            cpu: s.cpu.to_indices(),
                            numa: s.numa.to_indices(),
                            gpu: s.gpu.to_indices(),
                        })
                        .collect(),
                )
            }
            TargetType::Actuator => {
                let mut actuators = self.state.list_actuators().await;
                apply_filter(&mut actuators, &req.filter, |a| {
                    (a.uuid, a.name.as_str().to_owned())
                });
                EntityList::Actuator(actuators.iter().map(actuator_info).collect())
            }
        };
        WsMessage::ListReply(list)
    }

    /// Silently drops an event arriving less than `rate_limit` after the
    /// previous one accepted from the same sensor — enforced here, at the
    /// single point every producer's events pass through, rather than
    /// trusting each producer to self-throttle.
    async fn handle_event(&self, msg: EventMsg) -> WsMessage {
        {
            let mut last = self.last_event_ns.lock().await;
            if let Some(&previous) = last.get(&msg.sensor_uuid) {
                if msg.time_ns.saturating_sub(previous) < self.rate_limit.as_nanos() as u64 {
                    debug!(sensor = %msg.sensor_uuid, "event dropped, below NRM_RATELIMIT spacing");
                    return WsMessage::Ack;
                }
            }
            last.insert(msg.sensor_uuid, msg.time_ns);
        }

        let scope = Scope::from_spec(&msg.scope);
        self.eventbase
            .lock()
            .await
            .push_event(msg.sensor_uuid, scope, NrmTime::from_nanos(msg.time_ns), msg.value);
        if let Some(hook) = &self.callbacks.event {
            hook(&msg);
        }
        WsMessage::Ack
    }

    /// An out-of-domain value, or one a user `actuate` policy vetoes, is
    /// acknowledged without being committed or forwarded — not NAK'd — per
    /// the out-of-domain contract: the server replies ACK to acknowledge
    /// receipt and simply does not forward.
    async fn handle_actuate(&self, msg: ActuateMsg) -> WsMessage {
        if let Some(policy) = &self.callbacks.actuate {
            if let Some(actuator) = self.state.find_actuator(msg.actuator_uuid).await {
                if actuator.kind.validate(msg.value) && !policy(&actuator, msg.value) {
                    debug!(actuator = %msg.actuator_uuid, "actuate vetoed by user policy");
                    return WsMessage::Ack;
                }
            }
        }

        match self.state.actuate(msg.actuator_uuid, msg.value).await {
            Ok((value, clientid)) => {
                if self.transmit {
                    self.rpc_registry
                        .push(
                            clientid,
                            WsMessage::Actuate(ActuateMsg { actuator_uuid: msg.actuator_uuid, value }),
                        )
                        .await;
                }
                WsMessage::Ack
            }
            Err(StateError::Actuator(ActuatorError::OutOfDomain { value })) => {
                debug!(actuator = %msg.actuator_uuid, value, "actuate value out of domain, acking without forwarding");
                WsMessage::Ack
            }
            Err(e) => WsMessage::Nak(NakMsg { reason: e.to_string() }),
        }
    }

    /// Closes the current measurement window for every tracked series and
    /// publishes the resulting snapshot plus a DAEMON heartbeat tick.
    pub async fn tick(&self) {
        let now = NrmTime::now();
        let mut eb = self.eventbase.lock().await;
        eb.tick(now);
        let series: Vec<SeriesSnapshot> = eb
            .iter_series()
            .map(|(sensor_uuid, series)| SeriesSnapshot {
                sensor_uuid,
                scope: series.scope().to_spec(),
                start_time_ns: now.as_nanos(),
                events: series.closed_periods(),
            })
            .collect();
        drop(eb);
        if self.transmit {
            debug!(series_count = series.len(), "tick: publishing event snapshot");
            self.publisher
                .publish(nrm_proto::DAEMON_TOPIC, WsMessage::Events(EventsMsg { series }));
            self.publisher.publish(nrm_proto::DAEMON_TOPIC, WsMessage::Tick);
        }
        if let Some(hook) = &self.callbacks.timer {
            hook();
        }
    }
}

fn actuator_info(a: &Actuator) -> ActuatorInfo {
    ActuatorInfo {
        uuid: a.uuid,
        name: a.name.to_string(),
        kind: a.kind.to_spec(),
        value: a.value,
        clientid: a.clientid,
    }
}

fn apply_filter<T>(items: &mut Vec<T>, filter: &Option<FindQuery>, key: impl Fn(&T) -> (Uuid, String)) {
    let Some(query) = filter else { return };
    items.retain(|item| {
        let (uuid, name) = key(item);
        match query {
            FindQuery::Uuid(u) => uuid == *u,
            FindQuery::Name(n) => &name == n,
        }
    });
}
