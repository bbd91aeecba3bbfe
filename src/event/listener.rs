//! TraceListener Trait - sinks for recorded events
//!
//! Both callbacks default to no-ops, so a listener interested in only one of
//! them implements just that one.
//!
//! Key types:
//! - `TraceListener`: Trait notified by the recorder
//! - `NoopListener`: Zero-cost no-op implementation
//! - `EventCollector`: Clone-shared in-memory sink that builds an `EventStore`

use std::sync::Arc;

use parking_lot::RwLock;

use super::trev::Trev;
use crate::ast::{Node, NodeIndex};
use crate::error::Result;
use crate::store::{EventStore, UnitRecord};

/// Receives unit registrations and events, synchronously, in recording order
pub trait TraceListener: Send + Sync {
    fn on_unit_registered(&self, _unit_id: &str, _unit: &Node, _source_text: Option<&str>) {}

    fn on_event(&self, _event: &Trev) {}
}

/// Listener that ignores everything
#[derive(Debug, Clone, Default)]
pub struct NoopListener;

impl NoopListener {
    pub fn new() -> Self {
        Self
    }
}

impl TraceListener for NoopListener {}

/// In-memory sink; clones share the same buffers
#[derive(Clone, Default)]
pub struct EventCollector {
    units: Arc<RwLock<Vec<UnitRecord>>>,
    events: Arc<RwLock<Vec<Trev>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all events (cloned)
    pub fn events(&self) -> Vec<Trev> {
        self.events.read().clone()
    }

    /// Get all unit registrations (cloned)
    pub fn units(&self) -> Vec<UnitRecord> {
        self.units.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a store from everything collected so far, replaying the unit
    /// registrations into a fresh index.
    pub fn store(&self) -> Result<EventStore> {
        let mut index = NodeIndex::new();
        for record in self.units.read().iter() {
            index.add_unit_with_source(&record.unit_id, &record.unit, record.source_text.clone())?;
        }
        Ok(EventStore::new(self.events(), Arc::new(index)))
    }
}

impl TraceListener for EventCollector {
    fn on_unit_registered(&self, unit_id: &str, unit: &Node, source_text: Option<&str>) {
        self.units.write().push(UnitRecord {
            unit_id: unit_id.to_string(),
            unit: unit.clone(),
            source_text: source_text.map(str::to_string),
        });
    }

    fn on_event(&self, event: &Trev) {
        self.events.write().push(event.clone());
    }
}

impl std::fmt::Debug for EventCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCollector")
            .field("units", &self.units.read().len())
            .field("events", &self.len())
            .finish()
    }
}
