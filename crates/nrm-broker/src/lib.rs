//! Transport broker: the dialed (client/sensor) and listening (controller)
//! sides of the RPC and pub/sub connections, plus the actor that owns a
//! dialed socket on the client's behalf.

mod broker;
mod command;
mod dialing;
mod error;
mod listening;
mod role;

pub use broker::BrokerHandle;
pub use command::{BrokerCallbacks, BrokerCommand};
pub use dialing::SubscribeRequest;
pub use error::BrokerError;
pub use listening::{pub_router, rpc_router, ListeningState, Publisher, RpcHandler, RpcRegistry};
pub use role::Role;
