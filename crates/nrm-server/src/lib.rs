//! Server dispatcher: the reactor that turns inbound RPC requests into
//! entity-registry and event-base operations, plus the periodic tick that
//! closes measurement windows and republishes them.

mod callbacks;
mod config;
mod dispatcher;
mod server;

pub use callbacks::{ActuateCallback, EventCallback, ServerCallbacks, SignalCallback, TimerCallback};
pub use config::{ConfigError, ServerConfig};
pub use dispatcher::Server;
pub use server::{build, build_with_callbacks, Daemon};
