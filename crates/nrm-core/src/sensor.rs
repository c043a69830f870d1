use uuid::Uuid;

use crate::rcstring::RcString;

/// A registered source of measurements. Sensors carry no value themselves;
/// their readings live in the event base, keyed by `(sensor.uuid, scope)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sensor {
    pub uuid: Uuid,
    pub name: RcString,
}

impl Sensor {
    pub fn new(uuid: Uuid, name: impl Into<RcString>) -> Self {
        Sensor {
            uuid,
            name: name.into(),
        }
    }
}
