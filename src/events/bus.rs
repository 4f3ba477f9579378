//! Event bus for lifecycle events.
//!
//! The bus appends every published record to its log and dispatches it
//! synchronously to subscribers in subscription order. Records are never
//! reordered or dropped once accepted.

use super::record::{EventKind, EventRecord, EventScope};

/// Type alias for subscriber callbacks.
type Subscriber = Box<dyn FnMut(&EventRecord) + Send + 'static>;

/// Append-only event log with synchronous dispatch.
#[derive(Default)]
pub struct EventBus {
    /// Every accepted record, in emission order.
    records: Vec<EventRecord>,

    /// Callbacks receiving each record as it is accepted.
    subscribers: Vec<Subscriber>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("records", &self.records.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber that receives every record published from now on.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&EventRecord) + Send + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Publishes an event and returns its ordinal.
    pub fn publish(&mut self, kind: EventKind, payload: impl Into<String>, scope: &EventScope) -> u64 {
        self.publish_with_output(kind, payload, scope, Vec::new())
    }

    /// Publishes an event carrying action output lines.
    pub fn publish_with_output(
        &mut self,
        kind: EventKind,
        payload: impl Into<String>,
        scope: &EventScope,
        output: Vec<String>,
    ) -> u64 {
        let ordinal = self.records.len() as u64;
        let record = EventRecord {
            ordinal,
            kind,
            payload: payload.into(),
            scope: scope.clone(),
            output,
        };

        tracing::trace!(ordinal, kind = %record.kind, payload = %record.payload, "Event emitted");

        for subscriber in &mut self.subscribers {
            subscriber(&record);
        }
        self.records.push(record);
        ordinal
    }

    /// All accepted records in emission order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records of one kind, in emission order.
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the bus, returning the log.
    pub fn into_records(self) -> Vec<EventRecord> {
        self.records
    }
}
