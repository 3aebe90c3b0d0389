//! Registry notifications and the sinks that receive them

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RegistryError;

/// Notifications published by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RegistryEvent {
    /// A charity was created under `id`
    CharityListed { id: u64 },
}

/// An event with the time it was delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: RegistryEvent,
}

impl EventRecord {
    pub fn now(event: RegistryEvent) -> Self {
        Self {
            emitted_at: Utc::now(),
            event,
        }
    }
}

/// Receiver of registry events.
///
/// Delivery cannot fail the operation that produced the event, so sinks
/// handle their own errors.
pub trait EventSink {
    fn emit(&mut self, event: &RegistryEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &RegistryEvent) {
        (**self).emit(event)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: &RegistryEvent) {
        (**self).emit(event)
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &RegistryEvent) {}
}

/// Keeps events in memory, in emission order
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Vec<RegistryEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// Take every recorded event, leaving the sink empty
    pub fn drain(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for MemorySink {
    fn emit(&mut self, event: &RegistryEvent) {
        self.events.push(*event);
    }
}

/// Publishes events as structured `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: &RegistryEvent) {
        match event {
            RegistryEvent::CharityListed { id } => {
                info!(target: "charity_registry::events", id, "CharityListed");
            }
        }
    }
}

/// Appends events to a JSON Lines file, one [`EventRecord`] per line
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record written to the log
    pub fn read_all(&self) -> crate::Result<Vec<EventRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<EventRecord>(line).map_err(RegistryError::from))
            .collect()
    }

    fn append(&self, record: &EventRecord) -> crate::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl EventSink for JsonLinesSink {
    fn emit(&mut self, event: &RegistryEvent) {
        if let Err(e) = self.append(&EventRecord::now(*event)) {
            warn!(path = %self.path.display(), error = %e, "failed to append event");
        }
    }
}

/// Delivers each event to several sinks in order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink + Send>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&mut self, event: &RegistryEvent) {
        for sink in &mut self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_sink_records_in_order() {
        let mut sink = MemorySink::new();
        sink.emit(&RegistryEvent::CharityListed { id: 1 });
        sink.emit(&RegistryEvent::CharityListed { id: 2 });
        assert_eq!(
            sink.events(),
            &[
                RegistryEvent::CharityListed { id: 1 },
                RegistryEvent::CharityListed { id: 2 }
            ]
        );
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(RegistryEvent::CharityListed { id: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "CharityListed", "id": 1 }));
    }

    #[test]
    fn test_json_lines_sink_appends() {
        let dir = tempdir().unwrap();
        let mut sink = JsonLinesSink::new(dir.path().join("events.jsonl"));
        sink.emit(&RegistryEvent::CharityListed { id: 1 });
        sink.emit(&RegistryEvent::CharityListed { id: 2 });

        let records = sink.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].event, RegistryEvent::CharityListed { id: 2 });
    }

    #[test]
    fn test_fanout_delivers_to_every_sink() {
        let dir = tempdir().unwrap();
        let log = JsonLinesSink::new(dir.path().join("events.jsonl"));
        let mut fanout = FanoutSink::new().with(log.clone()).with(TracingSink);
        fanout.emit(&RegistryEvent::CharityListed { id: 9 });
        assert_eq!(log.read_all().unwrap().len(), 1);
    }
}
