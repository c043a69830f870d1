use uuid::Uuid;

use crate::rcstring::RcString;

/// An identity-only accounting unit grouping a set of actuators/sensors
/// under an application-chosen name. Slices carry no resource state of
/// their own; they exist so clients can group related entities and query
/// them as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub uuid: Uuid,
    pub name: RcString,
}

impl Slice {
    pub fn new(uuid: Uuid, name: impl Into<RcString>) -> Self {
        Slice {
            uuid,
            name: name.into(),
        }
    }
}
