// nrm-proto: wire message union and framing types for the resource-management
// broker protocol.
//
// All messages use a top-level `kind` field for discriminated
// deserialization, the same approach used by every device-facing message in
// this codebase: a tagged enum serialized through serde_json, so unknown
// fields on either side are ignored rather than rejected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Shared sub-types
// ---------------------------------------------------------------------------

/// The kind of entity an ADD/REMOVE/LIST request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Actuator,
    Scope,
    Sensor,
    Slice,
}

/// A scope as carried on the wire: three index arrays over disjoint resource
/// spaces (CPU, NUMA node, GPU). Used both for ADD requests (unregistered,
/// no uuid yet) and inline in EVENT messages (a sensor may tag a reading
/// against a scope value that was never separately registered).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSpec {
    pub name: String,
    #[serde(default)]
    pub cpu: Vec<u32>,
    #[serde(default)]
    pub numa: Vec<u32>,
    #[serde(default)]
    pub gpu: Vec<u32>,
}

/// A registered scope, echoed back by the server with its assigned uuid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeInfo {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub cpu: Vec<u32>,
    #[serde(default)]
    pub numa: Vec<u32>,
    #[serde(default)]
    pub gpu: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub uuid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceSpec {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceInfo {
    pub uuid: Uuid,
    pub name: String,
}

/// Admissible-value policy for an actuator, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActuatorKindSpec {
    Discrete { choices: Vec<f64> },
    Continuous { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorSpec {
    pub name: String,
    pub kind: ActuatorKindSpec,
    pub initial_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorInfo {
    pub uuid: Uuid,
    pub name: String,
    pub kind: ActuatorKindSpec,
    pub value: f64,
    /// Identity of the connection that registered this actuator. Set by the
    /// server; never rewritten.
    pub clientid: Uuid,
}

// ---------------------------------------------------------------------------
// ADD
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum AddBody {
    Actuator(ActuatorSpec),
    Scope(ScopeSpec),
    Sensor(SensorSpec),
    Slice(SliceSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddRequest {
    pub body: AddBody,
}

/// The entity as stored after assignment of a fresh uuid; echoed back so the
/// client learns the server-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum AddedEntity {
    Actuator(ActuatorInfo),
    Scope(ScopeInfo),
    Sensor(SensorInfo),
    Slice(SliceInfo),
}

impl AddedEntity {
    pub fn uuid(&self) -> Uuid {
        match self {
            AddedEntity::Actuator(a) => a.uuid,
            AddedEntity::Scope(s) => s.uuid,
            AddedEntity::Sensor(s) => s.uuid,
            AddedEntity::Slice(s) => s.uuid,
        }
    }

    pub fn target_type(&self) -> TargetType {
        match self {
            AddedEntity::Actuator(_) => TargetType::Actuator,
            AddedEntity::Scope(_) => TargetType::Scope,
            AddedEntity::Sensor(_) => TargetType::Sensor,
            AddedEntity::Slice(_) => TargetType::Slice,
        }
    }
}

// ---------------------------------------------------------------------------
// REMOVE
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub target: TargetType,
    pub uuid: Uuid,
}

// ---------------------------------------------------------------------------
// LIST / FIND
// ---------------------------------------------------------------------------

/// FIND is modeled as a LIST carrying an optional predicate, per the wire
/// contract: there is no separate FIND message kind, only a LIST request
/// whose `filter` narrows the reply to matching entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FindQuery {
    Name(String),
    Uuid(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRequest {
    pub target: TargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FindQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum EntityList {
    Actuator(Vec<ActuatorInfo>),
    Scope(Vec<ScopeInfo>),
    Sensor(Vec<SensorInfo>),
    Slice(Vec<SliceInfo>),
}

impl EntityList {
    pub fn len(&self) -> usize {
        match self {
            EntityList::Actuator(v) => v.len(),
            EntityList::Scope(v) => v.len(),
            EntityList::Sensor(v) => v.len(),
            EntityList::Slice(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// EVENT / EVENTS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMsg {
    pub sensor_uuid: Uuid,
    pub scope: ScopeSpec,
    pub time_ns: u64,
    pub value: f64,
}

/// One closed-period sample, `(time_ns, value)`.
pub type SamplePair = (u64, f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub sensor_uuid: Uuid,
    pub scope: ScopeSpec,
    pub start_time_ns: u64,
    pub events: Vec<SamplePair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsMsg {
    pub series: Vec<SeriesSnapshot>,
}

// ---------------------------------------------------------------------------
// ACTUATE
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuateMsg {
    pub actuator_uuid: Uuid,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// NAK (resolves the ADD-failure open question from the reference design:
// a distinct variant instead of overloading ACK)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NakMsg {
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Top-level discriminated union
// ---------------------------------------------------------------------------

/// All message kinds exchanged between client/sensor/controller roles.
///
/// Serializes/deserializes using the `kind` field as a tag:
/// ```json
/// { "kind": "add", "body": { "target": "sensor", "name": "S" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WsMessage {
    Ack,
    Nak(NakMsg),
    Add(AddRequest),
    AddReply(AddedEntity),
    Remove(RemoveRequest),
    List(ListRequest),
    ListReply(EntityList),
    Event(EventMsg),
    Events(EventsMsg),
    Actuate(ActuateMsg),
    Exit,
    Tick,
}

impl WsMessage {
    /// True for variants the broker delivers to the pipe as a reply to an
    /// outstanding request. False for variants that are server-initiated
    /// commands and go to the `cmd` callback instead.
    pub fn is_reply(&self) -> bool {
        matches!(
            self,
            WsMessage::Ack
                | WsMessage::Nak(_)
                | WsMessage::AddReply(_)
                | WsMessage::ListReply(_)
        )
    }

    /// True for variants that arrive unsolicited and must not be mistaken
    /// for a pending request's reply.
    pub fn is_command(&self) -> bool {
        matches!(self, WsMessage::Actuate(_) | WsMessage::Tick)
    }
}

// ---------------------------------------------------------------------------
// Framing envelopes
// ---------------------------------------------------------------------------

/// RPC framing: `[routing-identity] [empty delimiter] [packed payload]`.
/// The routing identity is empty on client-to-server sends; the server
/// fills it in from the connection it received the frame on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_id: Option<Uuid>,
    pub payload: WsMessage,
}

/// Pub/sub framing: `[topic string] [packed payload]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubFrame {
    pub topic: String,
    pub payload: WsMessage,
}

/// The reserved publisher-side topic for periodic health/tick messages.
pub const DAEMON_TOPIC: &str = "DAEMON";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn pack(msg: &WsMessage) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(msg)?)
}

pub fn unpack(text: &str) -> Result<WsMessage, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

pub fn pack_rpc(frame: &RpcFrame) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(frame)?)
}

pub fn unpack_rpc(text: &str) -> Result<RpcFrame, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

pub fn pack_pub(frame: &PubFrame) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(frame)?)
}

pub fn unpack_pub(text: &str) -> Result<PubFrame, DecodeError> {
    Ok(serde_json::from_str(text)?)
}
