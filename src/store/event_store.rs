//! EventStore - immutable, queryable collection of recorded events
//!
//! Stores are cheap persistent values: events, the id map and the node index
//! sit behind `Arc`s, and every query that looks like a mutation (`filter`,
//! `with_resolved_references`, ...) returns a new store.

use std::io::Write;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::facets::Facets;
use super::payload::{TracePayload, UnitRecord};
use crate::ast::{CompositeKey, IndexedNode, NodeIndex};
use crate::error::{Result, TrevError};
use crate::event::{TraceLine, Trev, TrevId};

/// Persistent ancestor chain, innermost first. Chains share their tails,
/// so resolving `n` events allocates at most `n` links.
#[derive(Debug)]
pub struct AncestorChain {
    id: TrevId,
    len: usize,
    up: Option<Arc<AncestorChain>>,
}

impl AncestorChain {
    fn push(up: Option<Arc<AncestorChain>>, id: TrevId) -> Arc<Self> {
        let len = up.as_ref().map_or(0, |c| c.len) + 1;
        Arc::new(Self { id, len, up })
    }

    /// Innermost ancestor first
    pub fn iter(&self) -> impl Iterator<Item = TrevId> + '_ {
        std::iter::successors(Some(self), |c| c.up.as_deref()).map(|c| c.id)
    }
}

impl Drop for AncestorChain {
    // Unlink iteratively; a recursive drop overflows on deep traces
    fn drop(&mut self) {
        let mut up = self.up.take();
        while let Some(link) = up {
            match Arc::try_unwrap(link) {
                Ok(mut inner) => up = inner.up.take(),
                Err(_) => break,
            }
        }
    }
}

/// Derived, query-time fields of one event
#[derive(Debug, Clone)]
struct Resolution {
    node: CompositeKey,
    ancestors: Option<Arc<AncestorChain>>,
}

/// Denormalized view of an event: the original record plus its node and
/// its enclosing events
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTrev<'a> {
    pub trev: &'a Trev,
    pub node: &'a IndexedNode,
    ancestors: Option<&'a AncestorChain>,
}

impl ResolvedTrev<'_> {
    /// Every enclosing event id, outermost first
    pub fn ancestor_ids(&self) -> Vec<TrevId> {
        let mut ids: Vec<TrevId> = self.ancestors.map(|c| c.iter().collect()).unwrap_or_default();
        ids.reverse();
        ids
    }

    /// Nesting depth (0 for top-level events)
    pub fn depth(&self) -> usize {
        self.ancestors.map_or(0, |c| c.len)
    }

    /// Innermost enclosing event id (the parent)
    pub fn parent_id(&self) -> Option<TrevId> {
        self.ancestors.map(|c| c.id)
    }
}

/// Ordered events (by id) plus the node index they reference
#[derive(Clone)]
pub struct EventStore {
    events: Arc<[Trev]>,
    positions: Arc<FxHashMap<TrevId, usize>>,
    index: Arc<NodeIndex>,
    resolution: Option<Arc<[Resolution]>>,
}

impl EventStore {
    /// Wrap recorded events; events are put in id order if they are not already
    pub fn new(mut events: Vec<Trev>, index: Arc<NodeIndex>) -> Self {
        if !events.windows(2).all(|w| w[0].id <= w[1].id) {
            events.sort_by_key(|e| e.id);
        }
        let positions = events
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.id, pos))
            .collect();
        Self {
            events: events.into(),
            positions: Arc::new(positions),
            index,
            resolution: None,
        }
    }

    pub fn get(&self, id: TrevId) -> Option<&Trev> {
        self.positions.get(&id).map(|&pos| &self.events[pos])
    }

    pub fn events(&self) -> &[Trev] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trev> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn index(&self) -> &Arc<NodeIndex> {
        &self.index
    }

    /// Events whose parent is `id`, in order
    pub fn children_of(&self, id: TrevId) -> Vec<&Trev> {
        self.iter().filter(|e| e.parent_id == Some(id)).collect()
    }

    /// Top-level events
    pub fn roots(&self) -> Vec<&Trev> {
        self.iter().filter(|e| e.parent_id.is_none()).collect()
    }

    /// Subset matching `predicate`, relative order kept, same node index.
    ///
    /// A resolved store stays resolved: each kept event keeps its derived view.
    pub fn filter<F>(&self, mut predicate: F) -> EventStore
    where
        F: FnMut(&Trev) -> bool,
    {
        let kept: Vec<usize> = (0..self.events.len())
            .filter(|&pos| predicate(&self.events[pos]))
            .collect();

        let events: Vec<Trev> = kept.iter().map(|&pos| self.events[pos].clone()).collect();
        let resolution = self
            .resolution
            .as_ref()
            .map(|res| kept.iter().map(|&pos| res[pos].clone()).collect());

        let mut store = EventStore::new(events, Arc::clone(&self.index));
        store.resolution = resolution;
        store
    }

    // ═══════════════════════════════════════════════════════════════
    // Denormalization
    // ═══════════════════════════════════════════════════════════════

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Resolve every event's node and ancestor chain.
    ///
    /// Chains are memoized per parent id across the pass, so deep recursive
    /// traces cost the sum of distinct chain lengths, not events × depth.
    pub fn with_resolved_references(&self) -> Result<EventStore> {
        let mut memo: FxHashMap<TrevId, Arc<AncestorChain>> = FxHashMap::default();
        let mut resolution = Vec::with_capacity(self.events.len());

        for event in self.events.iter() {
            let node = self
                .index
                .lookup(&event.unit_id, event.node_id)
                .ok_or_else(|| TrevError::UnresolvedNode {
                    event_id: event.id,
                    unit_id: event.unit_id.to_string(),
                    node_id: event.node_id,
                })?;

            let ancestors = match event.parent_id {
                Some(parent) => Some(self.chain_through(event.id, parent, &mut memo)?),
                None => None,
            };

            resolution.push(Resolution {
                node: node.key.clone(),
                ancestors,
            });
        }

        tracing::debug!(
            events = self.events.len(),
            chains = memo.len(),
            "Resolved event references"
        );

        Ok(EventStore {
            events: Arc::clone(&self.events),
            positions: Arc::clone(&self.positions),
            index: Arc::clone(&self.index),
            resolution: Some(resolution.into()),
        })
    }

    /// Chain whose innermost link is `parent`
    fn chain_through(
        &self,
        event_id: TrevId,
        parent: TrevId,
        memo: &mut FxHashMap<TrevId, Arc<AncestorChain>>,
    ) -> Result<Arc<AncestorChain>> {
        if let Some(hit) = memo.get(&parent) {
            return Ok(Arc::clone(hit));
        }

        // Walk up until the root or an already-memoized link
        let mut pending = Vec::new();
        let mut base = None;
        let mut cursor = Some(parent);
        let mut child = event_id;
        while let Some(id) = cursor {
            if let Some(hit) = memo.get(&id) {
                base = Some(Arc::clone(hit));
                break;
            }
            let trev = self.get(id).ok_or(TrevError::InvalidParent {
                event_id: child,
                parent_id: id,
            })?;
            if pending.len() > self.events.len() {
                return Err(TrevError::ParentCycle { event_id });
            }
            pending.push(id);
            child = id;
            cursor = trev.parent_id;
        }

        for id in pending.into_iter().rev() {
            let link = AncestorChain::push(base, id);
            memo.insert(id, Arc::clone(&link));
            base = Some(link);
        }
        // `pending` started with `parent`, so the last link pushed is it
        base.ok_or(TrevError::InvalidParent {
            event_id,
            parent_id: parent,
        })
    }

    /// Drop the derived view; the events are the very same records
    pub fn without_resolved_references(&self) -> EventStore {
        EventStore {
            events: Arc::clone(&self.events),
            positions: Arc::clone(&self.positions),
            index: Arc::clone(&self.index),
            resolution: None,
        }
    }

    /// Denormalized events, `None` unless the store was resolved
    pub fn resolved(&self) -> Option<impl Iterator<Item = ResolvedTrev<'_>> + '_> {
        let resolution = self.resolution.as_ref()?;
        Some(
            self.events
                .iter()
                .zip(resolution.iter())
                .filter_map(move |(trev, res)| self.view(trev, res)),
        )
    }

    /// Denormalized view of one event
    pub fn resolved_get(&self, id: TrevId) -> Option<ResolvedTrev<'_>> {
        let resolution = self.resolution.as_ref()?;
        let &pos = self.positions.get(&id)?;
        self.view(&self.events[pos], &resolution[pos])
    }

    fn view<'a>(&'a self, trev: &'a Trev, res: &'a Resolution) -> Option<ResolvedTrev<'a>> {
        Some(ResolvedTrev {
            trev,
            node: self.index.lookup_by_key(res.node.as_str())?,
            ancestors: res.ancestors.as_deref(),
        })
    }

    // ═══════════════════════════════════════════════════════════════
    // Facets
    // ═══════════════════════════════════════════════════════════════

    /// Single pass over the events; unresolvable nodes are skipped, not errors
    pub fn get_facets(&self) -> Facets {
        let mut facets = Facets::default();
        for event in self.events.iter() {
            match self.index.lookup(&event.unit_id, event.node_id) {
                Some(node) => facets.count(&node.key, &node.node_type, event.kind),
                None => facets.skipped += 1,
            }
        }
        facets
    }

    // ═══════════════════════════════════════════════════════════════
    // Persistence
    // ═══════════════════════════════════════════════════════════════

    /// All registered units plus the raw events
    pub fn serialize(&self) -> TracePayload {
        TracePayload {
            units: self.unit_records(),
            events: self.events.to_vec(),
        }
    }

    /// Rebuild the index by replaying unit registrations in payload order.
    ///
    /// Event references are not checked here; resolution does that.
    pub fn deserialize(payload: TracePayload) -> Result<EventStore> {
        let mut index = NodeIndex::new();
        for record in payload.units {
            index.add_unit_with_source(&record.unit_id, &record.unit, record.source_text)?;
        }
        tracing::debug!(
            units = index.unit_count(),
            events = payload.events.len(),
            "Deserialized trace payload"
        );
        Ok(EventStore::new(payload.events, Arc::new(index)))
    }

    /// Write units then events as NDJSON lines
    pub fn write_ndjson<W: Write>(&self, mut writer: W) -> Result<()> {
        for record in self.unit_records() {
            writeln!(writer, "{}", TraceLine::Unit(record).to_json_string()?)?;
        }
        for event in self.events.iter() {
            writeln!(writer, "{}", serde_json::to_string(event)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn unit_records(&self) -> Vec<UnitRecord> {
        self.index
            .units()
            .map(|unit| UnitRecord {
                unit_id: unit.id().to_string(),
                unit: unit.to_tree(),
                source_text: unit.source_text().map(str::to_string),
            })
            .collect()
    }
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("events", &self.events.len())
            .field("units", &self.index.unit_count())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
