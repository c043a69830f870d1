//! Client session facade: dials a controller's RPC and pub/sub endpoints
//! and exposes the entity-management and measurement API.

mod client;
mod error;

pub use client::Client;
pub use error::ClientError;
pub use nrm_broker::Role;
