use uuid::Uuid;

use nrm_client::{Client, Role};
use nrm_proto::{ActuatorKindSpec, EntityList, ScopeSpec, TargetType};
use nrm_test_support::TestDaemon;

fn test_client(daemon: &TestDaemon) -> Client {
    Client::connect(&daemon.rpc_url, &daemon.pub_url, None, Role::Client)
}

#[tokio::test]
async fn sensor_add_list_find_remove_round_trips() {
    let daemon = TestDaemon::start().await;
    let client = test_client(&daemon);

    let sensor = client.add_sensor("power0").await.expect("add_sensor");
    assert_eq!(sensor.name, "power0");

    let EntityList::Sensor(sensors) = client.list(TargetType::Sensor, None).await.unwrap() else {
        panic!("expected sensor list");
    };
    assert!(sensors.iter().any(|s| s.uuid == sensor.uuid));

    let EntityList::Sensor(found) = client
        .find_by_name(TargetType::Sensor, "power0")
        .await
        .unwrap()
    else {
        panic!("expected sensor list");
    };
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uuid, sensor.uuid);

    client.remove(TargetType::Sensor, sensor.uuid).await.unwrap();
    let EntityList::Sensor(remaining) = client.list(TargetType::Sensor, None).await.unwrap() else {
        panic!("expected sensor list");
    };
    assert!(remaining.is_empty());

    daemon.shutdown().await;
}

#[tokio::test]
async fn slice_and_scope_lifecycle() {
    let daemon = TestDaemon::start().await;
    let client = test_client(&daemon);

    let slice = client.add_slice("job-42").await.unwrap();
    assert_eq!(slice.name, "job-42");

    let scope = client
        .add_scope(ScopeSpec { name: "numa0".to_owned(), cpu: vec![0, 1, 2, 3], numa: vec![0], gpu: vec![] })
        .await
        .unwrap();
    assert_eq!(scope.cpu, vec![0, 1, 2, 3]);

    client.remove(TargetType::Slice, slice.uuid).await.unwrap();
    client.remove(TargetType::Scope, scope.uuid).await.unwrap();

    daemon.shutdown().await;
}

#[tokio::test]
async fn removing_unknown_uuid_fails_with_a_clear_error() {
    let daemon = TestDaemon::start().await;
    let client = test_client(&daemon);

    let err = client
        .remove(TargetType::Sensor, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, nrm_client::ClientError::Rejected(_)));

    daemon.shutdown().await;
}

#[tokio::test]
async fn actuator_add_reports_requesting_client_as_owner() {
    let daemon = TestDaemon::start().await;
    let client = test_client(&daemon);

    let actuator = client
        .add_actuator("fan0", ActuatorKindSpec::Continuous { min: 0.0, max: 100.0 }, 50.0)
        .await
        .unwrap();
    assert_eq!(actuator.value, 50.0);

    daemon.shutdown().await;
}
