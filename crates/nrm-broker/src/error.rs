/// Transport-level failures. Kept as a flat enum with a manual `Display`,
/// matching the texture used for other small leaf error types in this
/// codebase rather than pulling in `thiserror` derive machinery for a type
/// this shallow.
#[derive(Debug)]
pub enum BrokerError {
    Connect(String),
    Ws(String),
    Protocol(String),
    Decode(nrm_proto::DecodeError),
    Disconnected,
    Timeout,
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::Connect(s) => write!(f, "connection error: {s}"),
            BrokerError::Ws(s) => write!(f, "websocket error: {s}"),
            BrokerError::Protocol(s) => write!(f, "protocol error: {s}"),
            BrokerError::Decode(e) => write!(f, "decode error: {e}"),
            BrokerError::Disconnected => write!(f, "broker socket disconnected"),
            BrokerError::Timeout => write!(f, "timed out waiting for a reply"),
        }
    }
}

impl std::error::Error for BrokerError {}

impl From<nrm_proto::DecodeError> for BrokerError {
    fn from(e: nrm_proto::DecodeError) -> Self {
        BrokerError::Decode(e)
    }
}
