use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use nrm_client::{Client, Role};
use nrm_test_support::TestDaemon;

fn test_client(daemon: &TestDaemon) -> Arc<Client> {
    Arc::new(Client::connect(&daemon.rpc_url, &daemon.pub_url, None, Role::Client))
}

/// A raw connection that sends a frame the codec can't decode must be
/// dropped by the controller rather than wedging the daemon, leaving the
/// rest of the service usable.
#[tokio::test]
async fn malformed_rpc_frame_drops_the_connection_without_taking_down_the_daemon() {
    let daemon = TestDaemon::start().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("{}/rpc", daemon.rpc_url))
        .await
        .expect("connect");
    socket
        .send(Message::Text("not json at all".into()))
        .await
        .expect("send");

    let closed = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("timed out waiting for the connection to close");
    assert!(
        matches!(closed, None | Some(Ok(Message::Close(_)))),
        "expected the malformed connection to be closed, got {closed:?}"
    );

    // The daemon itself must still answer well-formed requests on a fresh
    // connection.
    let client = test_client(&daemon);
    client.add_sensor("still-alive").await.expect("daemon survived the malformed frame");

    daemon.shutdown().await;
}

#[tokio::test]
async fn removing_an_entity_twice_naks_the_second_time() {
    let daemon = TestDaemon::start().await;
    let client = test_client(&daemon);
    let sensor = client.add_sensor("temp0").await.unwrap();

    client
        .remove(nrm_proto::TargetType::Sensor, sensor.uuid)
        .await
        .expect("first remove succeeds");
    let err = client
        .remove(nrm_proto::TargetType::Sensor, sensor.uuid)
        .await
        .unwrap_err();
    assert!(matches!(err, nrm_client::ClientError::Rejected(_)));

    daemon.shutdown().await;
}

#[tokio::test]
async fn exit_request_acks_and_shuts_the_whole_daemon_down() {
    let daemon = TestDaemon::start().await;
    let client = test_client(&daemon);

    client.send_exit().await.expect("exit should be acked");

    let mut shutdown = daemon.server.shutdown_signal();
    tokio::time::timeout(Duration::from_secs(2), shutdown.changed())
        .await
        .expect("timed out waiting for shutdown signal")
        .expect("shutdown watch closed");
    assert!(*shutdown.borrow());

    daemon.shutdown().await;
}

#[tokio::test]
async fn sub_connection_that_never_sends_a_subscribe_request_is_closed() {
    let daemon = TestDaemon::start().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("{}/sub", daemon.pub_url))
        .await
        .expect("connect");
    socket.close(None).await.ok();

    let closed = tokio::time::timeout(Duration::from_secs(2), socket.next()).await;
    assert!(closed.is_ok(), "sub connection should close promptly, not hang");

    daemon.shutdown().await;
}
