use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use nrm_client::{Client, Role};
use nrm_proto::{ScopeSpec, WsMessage, DAEMON_TOPIC};
use nrm_test_support::TestDaemon;

fn test_client(daemon: &TestDaemon) -> Arc<Client> {
    Arc::new(Client::connect(&daemon.rpc_url, &daemon.pub_url, None, Role::Client))
}

#[tokio::test]
async fn periodic_tick_publishes_an_aggregated_snapshot() {
    let daemon = TestDaemon::start_with(8, 8, Duration::from_millis(30)).await;
    let client = test_client(&daemon);
    let sensor = client.add_sensor("temp0").await.unwrap();

    let (events_tx, mut events_rx) = mpsc::channel(32);
    client.start_event_listener(DAEMON_TOPIC, events_tx).await;

    let scope = ScopeSpec { name: "node".to_owned(), cpu: vec![0], numa: vec![], gpu: vec![] };
    client.send_event(sensor.uuid, scope.clone(), 1.0).await.unwrap();
    client.send_event(sensor.uuid, scope.clone(), 3.0).await.unwrap();

    let snapshot = loop {
        match tokio::time::timeout(Duration::from_secs(2), events_rx.recv())
            .await
            .expect("timed out waiting for a published snapshot")
            .expect("event channel closed")
        {
            WsMessage::Events(msg) => break msg,
            WsMessage::Tick => continue,
            other => panic!("unexpected published message: {other:?}"),
        }
    };

    let series = snapshot
        .series
        .iter()
        .find(|s| s.sensor_uuid == sensor.uuid)
        .expect("sensor should have a published series");
    assert_eq!(series.scope, scope);
    assert!(!series.events.is_empty());

    daemon.shutdown().await;
}

#[tokio::test]
async fn event_for_a_never_registered_sensor_uuid_is_still_accepted() {
    let daemon = TestDaemon::start().await;
    let client = test_client(&daemon);

    // The event base keys series by sensor uuid independently of the
    // sensor registry; a reading for a uuid nobody ADDed is still ACKed
    // and tracked, mirroring the reference event base's lazy series
    // creation.
    let scope = ScopeSpec { name: "node".to_owned(), cpu: vec![], numa: vec![], gpu: vec![] };
    client
        .send_event(uuid::Uuid::new_v4(), scope, 42.0)
        .await
        .unwrap();

    daemon.shutdown().await;
}
