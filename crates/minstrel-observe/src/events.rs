//! Collecting, logging and fan-out observers.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use minstrel_core::{Arguments, CallResult, MethodName, TypeId};
use minstrel_intercept::{CallEvent, EventKind, Observer, SharedObserver};

/// An owned copy of a [`CallEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Where in the call this event occurred.
    pub kind: EventKind,
    /// The wrapped type.
    pub type_id: TypeId,
    /// Name of the wrapped type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// The wrapped method.
    pub method: MethodName,
    /// The call's arguments.
    pub args: Arguments,
}

impl RecordedEvent {
    /// Check whether this event is for `type_name#method`.
    pub fn is_for(&self, type_name: &str, method: &str) -> bool {
        self.type_name == type_name && self.method.as_str() == method
    }
}

impl From<&CallEvent<'_>> for RecordedEvent {
    fn from(event: &CallEvent<'_>) -> Self {
        Self {
            kind: event.kind,
            type_id: event.type_id,
            type_name: event.type_name.to_string(),
            method: event.method.clone(),
            args: event.args.clone(),
        }
    }
}

/// An observer that keeps every event for later inspection.
///
/// Stops recording once `max_events` is reached.
pub struct CollectingObserver {
    events: RwLock<Vec<RecordedEvent>>,
    max_events: usize,
}

impl CollectingObserver {
    /// Create a collector holding at most `max_events` events.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events,
        }
    }

    /// Get collected events.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Take collected events, leaving the collector empty.
    pub fn take(&self) -> Vec<RecordedEvent> {
        std::mem::take(&mut *self.events.write())
    }

    /// Clear collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Get event count.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl Default for CollectingObserver {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Observer for CollectingObserver {
    fn observe(&self, event: &CallEvent<'_>) -> CallResult<()> {
        let mut events = self.events.write();
        if events.len() < self.max_events {
            events.push(RecordedEvent::from(event));
        }
        Ok(())
    }
}

impl std::fmt::Debug for CollectingObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectingObserver")
            .field("len", &self.len())
            .field("max_events", &self.max_events)
            .finish()
    }
}

/// An observer that emits every event through `tracing`.
///
/// Exceptions are always logged at `WARN`; other events at the configured
/// level.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    /// Level for enter and exit events.
    pub log_level: tracing::Level,
}

impl LoggingObserver {
    /// Create a logging observer at `DEBUG`.
    pub fn new() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
        }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.log_level = level;
        self
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn log_call(level: tracing::Level, event: &CallEvent<'_>, message: &str) {
    let kind = event.kind.as_str();
    let (type_name, method, args) = (event.type_name, event.method.as_str(), event.args);
    if level == tracing::Level::ERROR {
        tracing::error!(kind, type_name, method, %args, "{message}");
    } else if level == tracing::Level::WARN {
        tracing::warn!(kind, type_name, method, %args, "{message}");
    } else if level == tracing::Level::INFO {
        tracing::info!(kind, type_name, method, %args, "{message}");
    } else if level == tracing::Level::DEBUG {
        tracing::debug!(kind, type_name, method, %args, "{message}");
    } else {
        tracing::trace!(kind, type_name, method, %args, "{message}");
    }
}

impl Observer for LoggingObserver {
    fn observe(&self, event: &CallEvent<'_>) -> CallResult<()> {
        if event.kind.is_exception() {
            log_call(tracing::Level::WARN, event, "Call raised");
        } else if event.kind.is_enter() {
            log_call(self.log_level, event, "Call entered");
        } else {
            log_call(self.log_level, event, "Call returned");
        }
        Ok(())
    }
}

/// Fans each event out to several observers, in insertion order.
///
/// The first observer error stops the fan-out and is returned.
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<SharedObserver>,
}

impl ObserverSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    pub fn with(mut self, observer: SharedObserver) -> Self {
        self.observers.push(observer);
        self
    }

    /// Add an observer in place.
    pub fn push(&mut self, observer: SharedObserver) {
        self.observers.push(observer);
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Convert into a shared observer.
    pub fn into_shared(self) -> SharedObserver {
        Arc::new(self)
    }
}

impl Observer for ObserverSet {
    fn observe(&self, event: &CallEvent<'_>) -> CallResult<()> {
        self.observers
            .iter()
            .try_for_each(|observer| observer.observe(event))
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observer_count", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minstrel_core::CallError;

    fn call_event<'a>(
        kind: EventKind,
        method: &'a MethodName,
        args: &'a Arguments,
    ) -> CallEvent<'a> {
        CallEvent {
            kind,
            type_id: TypeId::OBJECT,
            type_name: "Widget",
            method,
            args,
        }
    }

    #[test]
    fn test_collecting_observer() {
        let collector = CollectingObserver::new(100);
        let method = MethodName::new("build");
        let args = Arguments::new().with(0);

        collector
            .observe(&call_event(EventKind::Enter, &method, &args))
            .unwrap();

        let events = collector.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_for("Widget", "build"));
        assert_eq!(events[0].args, args);
    }

    #[test]
    fn test_collecting_observer_max_events() {
        let collector = CollectingObserver::new(2);
        let method = MethodName::new("build");
        let args = Arguments::new();

        for _ in 0..5 {
            collector
                .observe(&call_event(EventKind::Exit, &method, &args))
                .unwrap();
        }

        assert_eq!(collector.len(), 2);
        assert_eq!(collector.take().len(), 2);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_recorded_event_json() {
        let method = MethodName::new("build");
        let args = Arguments::new().with(0);
        let recorded = RecordedEvent::from(&call_event(EventKind::ExitException, &method, &args));

        let json = serde_json::to_value(&recorded).unwrap();
        assert_eq!(json["kind"], "exit_exception");
        assert_eq!(json["type"], "Widget");
        assert_eq!(json["method"], "build");
        assert_eq!(json["args"]["positional"], serde_json::json!([0]));
    }

    #[test]
    fn test_logging_observer_never_fails() {
        let observer = LoggingObserver::new().with_level(tracing::Level::TRACE);
        let method = MethodName::new("build");
        let args = Arguments::new();

        for kind in [EventKind::Enter, EventKind::ExitException, EventKind::ClassExit] {
            assert!(observer.observe(&call_event(kind, &method, &args)).is_ok());
        }
    }

    #[test]
    fn test_observer_set_fans_out_and_stops_on_error() {
        let first = Arc::new(CollectingObserver::default());
        let last = Arc::new(CollectingObserver::default());
        let failing: SharedObserver = Arc::new(|_: &CallEvent<'_>| -> CallResult<()> {
            Err(CallError::Observer("full".to_string()))
        });

        let set = ObserverSet::new()
            .with(Arc::clone(&first) as SharedObserver)
            .with(failing)
            .with(Arc::clone(&last) as SharedObserver);
        assert_eq!(set.len(), 3);

        let method = MethodName::new("build");
        let args = Arguments::new();
        let result = set.observe(&call_event(EventKind::Enter, &method, &args));

        assert_eq!(result, Err(CallError::Observer("full".to_string())));
        assert_eq!(first.len(), 1);
        assert!(last.is_empty());
    }
}
