use std::env;

use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nrm_server::ServerConfig;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = ServerConfig::from_env().expect("invalid NRM_* environment configuration");
    info!(rpc_addr = %config.rpc_addr, pub_addr = %config.pub_addr, "starting nrmd");

    let daemon = nrm_server::build(&config);

    let rpc_listener = tokio::net::TcpListener::bind(&config.rpc_addr)
        .await
        .expect("failed to bind rpc address");
    let pub_listener = tokio::net::TcpListener::bind(&config.pub_addr)
        .await
        .expect("failed to bind pub address");
    info!(addr = %config.rpc_addr, "nrmd rpc router listening");
    info!(addr = %config.pub_addr, "nrmd pub/sub publisher listening");

    let (local_shutdown_tx, local_shutdown_rx) = watch::channel(false);
    let server = daemon.server.clone();
    let watcher_task = tokio::spawn(async move {
        let mut shutdown = server.shutdown_signal();
        loop {
            tokio::select! {
                _ = shutdown_signal() => {
                    if server.should_exit_on_signal() {
                        info!("termination signal accepted, shutting down");
                        break;
                    }
                    info!("termination signal vetoed by the signal policy hook, continuing");
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        let _ = local_shutdown_tx.send(true);
    });

    let rpc_serve = axum::serve(rpc_listener, daemon.rpc_router)
        .with_graceful_shutdown(wait_for_shutdown(local_shutdown_rx.clone()));
    let pub_serve = axum::serve(pub_listener, daemon.pub_router)
        .with_graceful_shutdown(wait_for_shutdown(local_shutdown_rx));

    tokio::try_join!(rpc_serve, pub_serve).expect("server error");

    watcher_task.abort();
    daemon.tick_task.abort();
    info!("nrmd shut down gracefully");
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to let the caller decide
/// whether it should actually trigger a shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C"); },
        _ = terminate => { info!("received SIGTERM"); },
    }
}
