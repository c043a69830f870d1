use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::event::{Event, NrmTime};
use crate::scope::Scope;

/// A fixed-capacity circular buffer. Pushing past capacity evicts the
/// oldest entry.
#[derive(Debug, Clone)]
struct RingBuffer {
    capacity: usize,
    items: VecDeque<Event>,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        RingBuffer {
            capacity: capacity.max(1),
            items: VecDeque::with_capacity(capacity),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    fn push_back(&mut self, event: Event) {
        if self.is_full() {
            self.items.pop_front();
        }
        self.items.push_back(event);
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn iter(&self) -> impl Iterator<Item = &Event> {
        self.items.iter()
    }

    fn back(&self) -> Option<&Event> {
        self.items.back()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Tracks one sensor's measurements against one scope: a current-window
/// ring buffer of raw samples, and a past-periods ring buffer of closed
/// windows.
///
/// When the current window is full and a new sample arrives, the whole
/// window collapses into a single aggregated sample (summed value, latest
/// timestamp) before the new sample is appended, rather than silently
/// dropping the oldest raw sample. Closing a period sums the current window
/// into one value and files it into the past ring, which evicts its own
/// oldest period once full.
#[derive(Debug, Clone)]
pub struct Series {
    scope: Scope,
    events: RingBuffer,
    past: RingBuffer,
}

impl Series {
    fn new(scope: Scope, max_events: usize, max_periods: usize) -> Self {
        Series {
            scope,
            events: RingBuffer::new(max_events),
            past: RingBuffer::new(max_periods),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    fn push_event(&mut self, time: NrmTime, value: f64) {
        if self.events.is_full() {
            let sum: f64 = self.events.iter().map(|e| e.value).sum();
            let last_time = self.events.back().map(|e| e.time).unwrap_or(time);
            self.events.clear();
            self.events.push_back(Event::new(last_time, sum));
        }
        self.events.push_back(Event::new(time, value));
    }

    /// Closes the current window: sums its samples into one period value
    /// and files it into the past ring, then clears the window.
    pub fn new_period(&mut self, time: NrmTime) {
        let sum: f64 = self.events.iter().map(|e| e.value).sum();
        self.events.clear();
        self.past.push_back(Event::new(time, sum));
    }

    pub fn last_value(&self) -> Option<f64> {
        self.events.back().map(|e| e.value)
    }

    pub fn window_len(&self) -> usize {
        self.events.len()
    }

    /// Closed periods, oldest first, as `(time_ns, value)` pairs for the
    /// wire snapshot.
    pub fn closed_periods(&self) -> Vec<(u64, f64)> {
        self.past
            .iter()
            .map(|e| (e.time.as_nanos(), e.value))
            .collect()
    }
}

/// Maps each sensor to a small linear list of `(scope, series)` pairs: one
/// per distinct scope that sensor has reported against. A linear scan
/// mirrors the reference implementation, which keeps the list short enough
/// in practice (a handful of scopes per sensor) that structural comparison
/// beats hashing scope contents.
pub struct EventBase {
    max_events: usize,
    max_periods: usize,
    sensors: HashMap<Uuid, Vec<Series>>,
}

impl EventBase {
    pub fn new(max_events: usize, max_periods: usize) -> Self {
        EventBase {
            max_events,
            max_periods,
            sensors: HashMap::new(),
        }
    }

    /// Registers a sensor with an empty scope list, so it shows up as known
    /// even before its first reading.
    pub fn add_sensor(&mut self, sensor_uuid: Uuid) {
        self.sensors.entry(sensor_uuid).or_default();
    }

    pub fn remove_sensor(&mut self, sensor_uuid: Uuid) {
        self.sensors.remove(&sensor_uuid);
    }

    pub fn push_event(&mut self, sensor_uuid: Uuid, scope: Scope, time: NrmTime, value: f64) {
        let list = self.sensors.entry(sensor_uuid).or_default();
        if let Some(series) = list.iter_mut().find(|s| s.scope == scope) {
            series.push_event(time, value);
            return;
        }
        let mut series = Series::new(scope, self.max_events, self.max_periods);
        series.push_event(time, value);
        list.push(series);
    }

    /// Closes the current window for every tracked series, filing it into
    /// that series' past-periods ring.
    pub fn tick(&mut self, time: NrmTime) {
        for list in self.sensors.values_mut() {
            for series in list {
                series.new_period(time);
            }
        }
    }

    pub fn last_value(&self, sensor_uuid: Uuid, scope: &Scope) -> Option<f64> {
        self.sensors
            .get(&sensor_uuid)
            .and_then(|list| list.iter().find(|s| &s.scope == scope))
            .and_then(Series::last_value)
    }

    /// All `(sensor_uuid, series)` pairs, for publishing a full snapshot.
    pub fn iter_series(&self) -> impl Iterator<Item = (Uuid, &Series)> {
        self.sensors
            .iter()
            .flat_map(|(uuid, list)| list.iter().map(move |s| (*uuid, s)))
    }

    /// True if any tracked series still keys on the same resource set as
    /// `scope` (structural equality, the same comparison `push_event` uses).
    /// Consulted before a scope removal, so a scope can't be dropped out
    /// from under a series that still reports against its resource set —
    /// events carry resource sets by value, never a registered uuid, so
    /// this can't be a uuid lookup.
    pub fn scope_in_use(&self, scope: &Scope) -> bool {
        self.sensors.values().flatten().any(|s| s.scope() == scope)
    }
}
