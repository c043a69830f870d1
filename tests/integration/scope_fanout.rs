use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use nrm_client::{Client, Role};
use nrm_proto::{ActuatorKindSpec, WsMessage};
use nrm_test_support::TestDaemon;

fn test_client(daemon: &TestDaemon) -> Arc<Client> {
    Arc::new(Client::connect(&daemon.rpc_url, &daemon.pub_url, None, Role::Client))
}

/// ACTUATE confirmations are pushed only to the connection that owns the
/// actuator; a second owner's listener must never see a push meant for the
/// first.
#[tokio::test]
async fn actuate_confirmation_is_delivered_only_to_the_owning_connection() {
    let daemon = TestDaemon::start().await;
    let fan_owner = test_client(&daemon);
    let fan = fan_owner
        .add_actuator("fan0", ActuatorKindSpec::Continuous { min: 0.0, max: 100.0 }, 0.0)
        .await
        .unwrap();
    let pump_owner = test_client(&daemon);
    let pump = pump_owner
        .add_actuator("pump0", ActuatorKindSpec::Continuous { min: 0.0, max: 100.0 }, 0.0)
        .await
        .unwrap();

    let (fan_tx, mut fan_rx) = mpsc::channel(8);
    fan_owner.start_actuate_listener(fan_tx);
    let (pump_tx, mut pump_rx) = mpsc::channel(8);
    pump_owner.start_actuate_listener(pump_tx);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let controller = test_client(&daemon);
    controller.actuate(pump.uuid, 30.0).await.unwrap();
    controller.actuate(fan.uuid, 70.0).await.unwrap();

    let pushed = tokio::time::timeout(Duration::from_secs(2), fan_rx.recv())
        .await
        .expect("timed out waiting for the fan owner's confirmation")
        .expect("channel closed");
    assert_eq!(pushed.actuator_uuid, fan.uuid);

    let pushed = tokio::time::timeout(Duration::from_secs(2), pump_rx.recv())
        .await
        .expect("timed out waiting for the pump owner's confirmation")
        .expect("channel closed");
    assert_eq!(pushed.actuator_uuid, pump.uuid);

    // Neither owner ever sees the other's confirmation.
    assert!(fan_rx.try_recv().is_err());
    assert!(pump_rx.try_recv().is_err());

    daemon.shutdown().await;
}

#[tokio::test]
async fn daemon_topic_subscriber_sees_tick_but_not_actuator_pushes() {
    let daemon = TestDaemon::start_with(8, 8, Duration::from_millis(30)).await;
    let owner = test_client(&daemon);
    let fan = owner
        .add_actuator("fan0", ActuatorKindSpec::Continuous { min: 0.0, max: 100.0 }, 0.0)
        .await
        .unwrap();

    let subscriber = test_client(&daemon);
    let (events_tx, mut events_rx) = mpsc::channel(32);
    subscriber
        .start_event_listener(nrm_proto::DAEMON_TOPIC, events_tx)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    owner.actuate(fan.uuid, 50.0).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), events_rx.recv())
        .await
        .expect("timed out waiting for the daemon heartbeat")
        .expect("channel closed");
    assert!(
        matches!(first, WsMessage::Events(_) | WsMessage::Tick),
        "expected a daemon-topic message, got {first:?}"
    );

    daemon.shutdown().await;
}
