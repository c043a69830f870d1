//! Shared test support: spins up a real `nrmd` daemon bound to two
//! ephemeral ports so integration tests can dial real WebSocket
//! connections against it, the way the teacher's `rt-test-utils` spins up
//! a mock WS server for its end-to-end suites.

use std::sync::Arc;

use tokio::task::JoinHandle;

use nrm_server::{Server, ServerCallbacks, ServerConfig};

pub struct TestDaemon {
    pub rpc_url: String,
    pub pub_url: String,
    pub server: Arc<Server>,
    rpc_task: JoinHandle<()>,
    pub_task: JoinHandle<()>,
    tick_task: JoinHandle<()>,
}

impl TestDaemon {
    /// Starts a daemon on ephemeral ports, with a short tick period so
    /// tests don't have to wait long for a published snapshot.
    pub async fn start() -> Self {
        Self::start_with(8, 8, std::time::Duration::from_millis(50)).await
    }

    pub async fn start_with(
        max_events: usize,
        max_periods: usize,
        tick_period: std::time::Duration,
    ) -> Self {
        Self::start_with_callbacks(max_events, max_periods, tick_period, ServerCallbacks::default())
            .await
    }

    pub async fn start_with_callbacks(
        max_events: usize,
        max_periods: usize,
        tick_period: std::time::Duration,
        callbacks: ServerCallbacks,
    ) -> Self {
        let config = ServerConfig {
            rpc_addr: "127.0.0.1:0".to_owned(),
            pub_addr: "127.0.0.1:0".to_owned(),
            request_timeout: std::time::Duration::from_secs(5),
            tick_period,
            max_events,
            max_periods,
            ..ServerConfig::default()
        };
        let daemon = nrm_server::build_with_callbacks(&config, callbacks);

        let rpc_listener = tokio::net::TcpListener::bind(&config.rpc_addr)
            .await
            .expect("failed to bind ephemeral rpc port");
        let rpc_addr = rpc_listener.local_addr().expect("local_addr");
        let pub_listener = tokio::net::TcpListener::bind(&config.pub_addr)
            .await
            .expect("failed to bind ephemeral pub port");
        let pub_addr = pub_listener.local_addr().expect("local_addr");

        let server = daemon.server.clone();
        let rpc_task = tokio::spawn(async move {
            axum::serve(rpc_listener, daemon.rpc_router)
                .await
                .expect("test daemon rpc server error");
        });
        let pub_task = tokio::spawn(async move {
            axum::serve(pub_listener, daemon.pub_router)
                .await
                .expect("test daemon pub server error");
        });

        TestDaemon {
            rpc_url: format!("ws://{rpc_addr}"),
            pub_url: format!("ws://{pub_addr}"),
            server,
            rpc_task,
            pub_task,
            tick_task: daemon.tick_task,
        }
    }

    pub async fn shutdown(self) {
        self.rpc_task.abort();
        self.pub_task.abort();
        self.tick_task.abort();
    }
}
