use std::time::Duration;

/// Server configuration, read entirely from the environment (no config
/// file): the daemon is meant to be launched from a process supervisor or a
/// job script, so env vars are the natural surface.
///
/// `rpc_addr` and `pub_addr` are derived from `NRM_UPSTREAM_URI` plus its two
/// port variables: the transport is two sockets (an RPC router and a pub/sub
/// publisher), not one, and this edition binds one axum listener per socket,
/// sharing the same dispatcher.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rpc_addr: String,
    pub pub_addr: String,
    pub request_timeout: Duration,
    pub tick_period: Duration,
    pub max_events: usize,
    pub max_periods: usize,
    pub rate_limit: Duration,
    pub transmit: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidInt { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidInt { var, value } => {
                write!(f, "{var} must be an integer, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn env_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidInt { var, value: v }),
        Err(_) => Ok(default),
    }
}

fn env_usize(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(var) {
        Ok(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidInt { var, value: v }),
        Err(_) => Ok(default),
    }
}

/// Strips a `tcp://` (or any `scheme://`) prefix, leaving a bare host
/// suitable for pairing with a port to produce a socket address.
fn strip_scheme(uri: &str) -> &str {
    uri.split("://").last().unwrap_or(uri)
}

impl ServerConfig {
    /// Reads the documented `NRM_*` variables, falling back to their
    /// documented defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let uri = std::env::var("NRM_UPSTREAM_URI").unwrap_or_else(|_| "tcp://127.0.0.1".to_owned());
        let host = strip_scheme(&uri).to_owned();
        let rpc_port = env_u64("NRM_UPSTREAM_RPC_PORT", 3456)?;
        let pub_port = env_u64("NRM_UPSTREAM_PUB_PORT", 2345)?;
        let transmit = env_u64("NRM_TRANSMIT", 1)? != 0;
        Ok(ServerConfig {
            rpc_addr: format!("{host}:{rpc_port}"),
            pub_addr: format!("{host}:{pub_port}"),
            request_timeout: Duration::from_millis(env_u64("NRM_TIMEOUT", 1_000)?),
            tick_period: Duration::from_millis(env_u64("NRM_TICK_PERIOD", 1_000)?),
            max_events: env_usize("NRM_EVENTS_LIMIT", 5)?,
            max_periods: env_usize("NRM_HISTORY_LIMIT", 100)?,
            rate_limit: Duration::from_nanos(env_u64("NRM_RATELIMIT", 10_000_000)?),
            transmit,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            rpc_addr: "127.0.0.1:3456".to_owned(),
            pub_addr: "127.0.0.1:2345".to_owned(),
            request_timeout: Duration::from_millis(1_000),
            tick_period: Duration::from_secs(1),
            max_events: 5,
            max_periods: 100,
            rate_limit: Duration::from_nanos(10_000_000),
            transmit: true,
        }
    }
}
