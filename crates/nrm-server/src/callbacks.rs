//! User-pluggable policy hooks. The control-loop math that decides whether
//! an actuation should happen, what a tick should do beyond closing the
//! window, and whether a signal should really terminate the daemon is
//! explicitly out of this crate's scope; these hooks are the seam where an
//! embedding application supplies that logic. Any hook left unset falls back
//! to the dispatcher's own default behavior.

use std::sync::Arc;

use nrm_core::Actuator;
use nrm_proto::EventMsg;

/// Consulted only after the actuator's own domain validation already
/// accepted `value`; returning `false` vetoes the actuation the same way an
/// out-of-domain value does (ACK, no forward).
pub type ActuateCallback = Arc<dyn Fn(&Actuator, f64) -> bool + Send + Sync>;

/// Invoked once an EVENT has been recorded in the event base.
pub type EventCallback = Arc<dyn Fn(&EventMsg) + Send + Sync>;

/// Invoked once per tick, after the default window-close-and-publish work.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Invoked when the process receives a termination signal; returning
/// `false` vetoes the default exit-on-signal behavior.
pub type SignalCallback = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct ServerCallbacks {
    pub actuate: Option<ActuateCallback>,
    pub event: Option<EventCallback>,
    pub timer: Option<TimerCallback>,
    pub signal: Option<SignalCallback>,
}
