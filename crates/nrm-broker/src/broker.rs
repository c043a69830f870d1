use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use nrm_proto::{PubFrame, WsMessage};

use crate::command::{BrokerCallbacks, BrokerCommand};
use crate::dialing::{run_rpc, run_sub};
use crate::error::BrokerError;

/// A handle to a spawned dialed connection: a pipe to send it commands, and
/// the task's join handle so the owner can wait for clean shutdown.
pub struct BrokerHandle {
    commands: mpsc::Sender<BrokerCommand>,
    task: JoinHandle<Result<(), BrokerError>>,
}

impl BrokerHandle {
    /// Dials an RPC connection and spawns its reactor task.
    pub fn dial_rpc(url: impl Into<String>, token: Option<String>, callbacks: BrokerCallbacks) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let url = url.into();
        let task = tokio::spawn(run_rpc(url, token, rx, callbacks));
        BrokerHandle { commands: tx, task }
    }

    /// Dials a sub connection and spawns its reactor task.
    pub fn dial_sub(
        url: impl Into<String>,
        token: Option<String>,
        topic_prefix: impl Into<String>,
        callbacks: BrokerCallbacks,
    ) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let url = url.into();
        let topic_prefix = topic_prefix.into();
        let task = tokio::spawn(run_sub(url, token, topic_prefix, rx, callbacks));
        BrokerHandle { commands: tx, task }
    }

    /// Sends an RPC request and awaits its reply.
    pub async fn send_rpc(&self, request: WsMessage) -> Result<WsMessage, BrokerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(BrokerCommand::SendRpc { request, reply: reply_tx })
            .await
            .map_err(|_| BrokerError::Disconnected)?;
        reply_rx.await.map_err(|_| BrokerError::Disconnected)?
    }

    pub async fn publish(&self, frame: PubFrame) -> Result<(), BrokerError> {
        self.commands
            .send(BrokerCommand::Publish(frame))
            .await
            .map_err(|_| BrokerError::Disconnected)
    }

    /// Signals the connection to close and waits for its task to exit.
    pub async fn terminate(self) -> Result<(), BrokerError> {
        let _ = self.commands.send(BrokerCommand::Terminate).await;
        match self.task.await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::Disconnected),
        }
    }
}
