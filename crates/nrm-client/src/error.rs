use nrm_broker::BrokerError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] BrokerError),
    #[error("server rejected the request: {0}")]
    Rejected(String),
    #[error("server sent an unexpected reply: {0:?}")]
    UnexpectedReply(nrm_proto::WsMessage),
}
