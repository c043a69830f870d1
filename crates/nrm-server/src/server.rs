use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;
use tracing::info;

use nrm_broker::{pub_router, rpc_router, ListeningState, Publisher, RpcRegistry};

use crate::callbacks::ServerCallbacks;
use crate::config::ServerConfig;
use crate::dispatcher::Server;

/// Everything needed to run the daemon: the two axum routers to serve (RPC
/// and pub/sub dial in on separate ports, per the transport's two-socket
/// layout), the dispatcher they talk to, and the background tick task's
/// handle.
pub struct Daemon {
    pub rpc_router: Router,
    pub pub_router: Router,
    pub server: Arc<Server>,
    pub tick_task: JoinHandle<()>,
}

/// Wires the dispatcher to the broker's listening transport and starts the
/// periodic tick that closes measurement windows and publishes snapshots,
/// using the default (accept-everything) policy hooks.
pub fn build(config: &ServerConfig) -> Daemon {
    build_with_callbacks(config, ServerCallbacks::default())
}

/// As [`build`], but lets an embedding application supply its own
/// actuate/event/timer/signal policy hooks.
pub fn build_with_callbacks(config: &ServerConfig, callbacks: ServerCallbacks) -> Daemon {
    let publisher = Publisher::new();
    let rpc_registry = RpcRegistry::new();
    let server = Server::new(config, publisher.clone(), rpc_registry.clone(), callbacks);

    let dispatch = server.clone();
    let rpc_handler: nrm_broker::RpcHandler = Arc::new(move |connection_id, request| {
        let dispatch = dispatch.clone();
        Box::pin(async move { dispatch.handle(connection_id, request).await })
    });

    let state = ListeningState::new(rpc_handler, publisher, rpc_registry);
    let rpc_router = rpc_router(state.clone());
    let pub_router = pub_router(state);

    let tick_period = config.tick_period;
    let tick_server = server.clone();
    let mut shutdown = server.shutdown_signal();
    let tick_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_period);
        loop {
            tokio::select! {
                _ = interval.tick() => tick_server.tick().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("tick task observed shutdown signal, exiting");
                        return;
                    }
                }
            }
        }
    });

    Daemon { rpc_router, pub_router, server, tick_task }
}
