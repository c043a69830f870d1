use tokio::sync::oneshot;

use nrm_proto::{PubFrame, WsMessage};

use crate::error::BrokerError;

/// What a broker owner asks the broker task to do over its pipe. Mirrors the
/// ZEROMQ-era `nrm_ctrlmsg` vocabulary: send an RPC request and wait for the
/// matching reply, publish on a topic, or shut the connection down.
pub enum BrokerCommand {
    SendRpc {
        request: WsMessage,
        reply: oneshot::Sender<Result<WsMessage, BrokerError>>,
    },
    Publish(PubFrame),
    Subscribe(String),
    Terminate,
}

/// Callbacks the broker invokes on traffic it did not itself solicit: an
/// unsolicited command arriving on the RPC channel (e.g. TICK or ACTUATE
/// pushed by the controller), and a message arriving on a subscribed topic.
pub struct BrokerCallbacks {
    pub on_command: tokio::sync::mpsc::Sender<WsMessage>,
    pub on_pub: tokio::sync::mpsc::Sender<PubFrame>,
}
