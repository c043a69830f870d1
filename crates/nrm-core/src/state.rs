use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::actuator::{Actuator, ActuatorError};
use crate::scope::Scope;
use crate::sensor::Sensor;
use crate::slice::Slice;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StateError {
    #[error("no entity with uuid {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

/// The daemon-wide registry of known entities, one table per entity kind.
/// Each table is an independently-lockable `HashMap`, so a lookup in one
/// table never blocks writers on another.
///
/// Rejecting removal of a scope still referenced by the event base is not
/// this type's concern: that check needs the event base, which the
/// dispatcher holds separately, so it is performed there before
/// `remove_scope` is called.
#[derive(Default)]
pub struct DaemonState {
    scopes: RwLock<HashMap<Uuid, Scope>>,
    sensors: RwLock<HashMap<Uuid, Sensor>>,
    slices: RwLock<HashMap<Uuid, Slice>>,
    actuators: RwLock<HashMap<Uuid, Actuator>>,
}

impl DaemonState {
    pub fn new() -> Arc<Self> {
        Arc::new(DaemonState::default())
    }

    // -- scopes --------------------------------------------------------

    pub async fn add_scope(&self, scope: Scope) -> Uuid {
        let uuid = scope.uuid.unwrap_or_else(Uuid::new_v4);
        let scope = scope.registered(uuid);
        self.scopes.write().await.insert(uuid, scope);
        uuid
    }

    pub async fn remove_scope(&self, uuid: Uuid) -> Result<Scope, StateError> {
        self.scopes
            .write()
            .await
            .remove(&uuid)
            .ok_or(StateError::NotFound(uuid))
    }

    pub async fn find_scope(&self, uuid: Uuid) -> Option<Scope> {
        self.scopes.read().await.get(&uuid).cloned()
    }

    pub async fn list_scopes(&self) -> Vec<Scope> {
        self.scopes.read().await.values().cloned().collect()
    }

    // -- sensors ---------------------------------------------------------

    pub async fn add_sensor(&self, name: impl Into<crate::rcstring::RcString>) -> Sensor {
        let sensor = Sensor::new(Uuid::new_v4(), name);
        self.sensors
            .write()
            .await
            .insert(sensor.uuid, sensor.clone());
        sensor
    }

    pub async fn remove_sensor(&self, uuid: Uuid) -> Result<Sensor, StateError> {
        self.sensors
            .write()
            .await
            .remove(&uuid)
            .ok_or(StateError::NotFound(uuid))
    }

    pub async fn find_sensor(&self, uuid: Uuid) -> Option<Sensor> {
        self.sensors.read().await.get(&uuid).cloned()
    }

    pub async fn find_sensor_by_name(&self, name: &str) -> Option<Sensor> {
        self.sensors
            .read()
            .await
            .values()
            .find(|s| s.name.as_str() == name)
            .cloned()
    }

    pub async fn list_sensors(&self) -> Vec<Sensor> {
        self.sensors.read().await.values().cloned().collect()
    }

    // -- slices ------------------------------------------------------------

    pub async fn add_slice(&self, name: impl Into<crate::rcstring::RcString>) -> Slice {
        let slice = Slice::new(Uuid::new_v4(), name);
        self.slices.write().await.insert(slice.uuid, slice.clone());
        slice
    }

    pub async fn remove_slice(&self, uuid: Uuid) -> Result<Slice, StateError> {
        self.slices
            .write()
            .await
            .remove(&uuid)
            .ok_or(StateError::NotFound(uuid))
    }

    pub async fn find_slice(&self, uuid: Uuid) -> Option<Slice> {
        self.slices.read().await.get(&uuid).cloned()
    }

    pub async fn list_slices(&self) -> Vec<Slice> {
        self.slices.read().await.values().cloned().collect()
    }

    // -- actuators -----------------------------------------------------

    pub async fn add_actuator(&self, actuator: Actuator) -> Uuid {
        let uuid = actuator.uuid;
        self.actuators.write().await.insert(uuid, actuator);
        uuid
    }

    pub async fn remove_actuator(&self, uuid: Uuid) -> Result<Actuator, StateError> {
        self.actuators
            .write()
            .await
            .remove(&uuid)
            .ok_or(StateError::NotFound(uuid))
    }

    pub async fn find_actuator(&self, uuid: Uuid) -> Option<Actuator> {
        self.actuators.read().await.get(&uuid).cloned()
    }

    pub async fn list_actuators(&self) -> Vec<Actuator> {
        self.actuators.read().await.values().cloned().collect()
    }

    /// Returns the accepted value and the actuator's owning `clientid`, so
    /// the caller can push the confirmation to that connection without a
    /// second lookup.
    pub async fn actuate(&self, uuid: Uuid, value: f64) -> Result<(f64, Uuid), StateError> {
        let mut table = self.actuators.write().await;
        let actuator = table.get_mut(&uuid).ok_or(StateError::NotFound(uuid))?;
        let value = actuator.actuate(value)?;
        Ok((value, actuator.clientid))
    }
}
