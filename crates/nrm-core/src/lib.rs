//! Shared domain types for the resource-management daemon: the entity model
//! (scopes, sensors, slices, actuators), the time-series event base, and the
//! daemon-wide registry that ties them together.

mod actuator;
mod bitmap;
mod event;
mod eventbase;
mod rcstring;
mod scope;
mod sensor;
mod slice;
mod state;

pub use actuator::{Actuator, ActuatorError, ActuatorKind};
pub use bitmap::{AtomicBitmap, Bitmap};
pub use event::{Event, NrmTime};
pub use eventbase::{EventBase, Series};
pub use rcstring::RcString;
pub use scope::Scope;
pub use sensor::Sensor;
pub use slice::Slice;
pub use state::{DaemonState, StateError};
