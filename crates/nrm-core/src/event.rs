use std::time::{SystemTime, UNIX_EPOCH};

/// A monotonic-ish timestamp in nanoseconds since the Unix epoch, matching
/// the wire representation used for `time_ns` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NrmTime(u64);

impl NrmTime {
    pub fn from_nanos(ns: u64) -> Self {
        NrmTime(ns)
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn now() -> Self {
        let ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        NrmTime(ns)
    }
}

/// One sample pushed into a sensor's series: a timestamp and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub time: NrmTime,
    pub value: f64,
}

impl Event {
    pub fn new(time: NrmTime, value: f64) -> Self {
        Event { time, value }
    }
}
