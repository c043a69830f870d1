use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use nrm_client::{Client, Role};
use nrm_proto::ActuatorKindSpec;
use nrm_test_support::TestDaemon;

fn test_client(daemon: &TestDaemon) -> Arc<Client> {
    Arc::new(Client::connect(&daemon.rpc_url, &daemon.pub_url, None, Role::Client))
}

#[tokio::test]
async fn actuate_accepts_an_in_domain_value_and_delivers_it_to_the_owner() {
    let daemon = TestDaemon::start().await;
    let owner = test_client(&daemon);
    let actuator = owner
        .add_actuator("fan0", ActuatorKindSpec::Discrete { choices: vec![0.0, 50.0, 100.0] }, 0.0)
        .await
        .unwrap();

    let (actuate_tx, mut actuate_rx) = mpsc::channel(8);
    owner.start_actuate_listener(actuate_tx);
    // give the owner's RPC connection a moment to be registered before we act
    tokio::time::sleep(Duration::from_millis(50)).await;

    let controller = test_client(&daemon);
    controller.actuate(actuator.uuid, 50.0).await.unwrap();

    let pushed = tokio::time::timeout(Duration::from_secs(2), actuate_rx.recv())
        .await
        .expect("timed out waiting for the actuate confirmation")
        .expect("channel closed");
    assert_eq!(pushed.actuator_uuid, actuator.uuid);
    assert_eq!(pushed.value, 50.0);

    daemon.shutdown().await;
}

#[tokio::test]
async fn actuate_out_of_domain_value_is_acked_without_mutating_or_forwarding() {
    let daemon = TestDaemon::start().await;
    let owner = test_client(&daemon);
    let actuator = owner
        .add_actuator("valve0", ActuatorKindSpec::Discrete { choices: vec![0.0, 0.5, 1.0] }, 0.0)
        .await
        .unwrap();

    let (actuate_tx, mut actuate_rx) = mpsc::channel(8);
    owner.start_actuate_listener(actuate_tx);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The server ACKs receipt of an out-of-domain value without committing
    // or forwarding it.
    owner.actuate(actuator.uuid, 0.3).await.unwrap();

    let list = owner.list(nrm_proto::TargetType::Actuator, None).await.unwrap();
    let nrm_proto::EntityList::Actuator(actuators) = list else {
        panic!("expected actuator list");
    };
    assert_eq!(actuators[0].value, 0.0);
    assert!(actuate_rx.try_recv().is_err());

    daemon.shutdown().await;
}

#[tokio::test]
async fn actuate_unknown_actuator_is_rejected() {
    let daemon = TestDaemon::start().await;
    let client = test_client(&daemon);
    let err = client
        .actuate(uuid::Uuid::new_v4(), 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, nrm_client::ClientError::Rejected(_)));

    daemon.shutdown().await;
}
