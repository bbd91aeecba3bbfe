//! Facets - aggregate event counts by node, node type and event kind

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ast::CompositeKey;
use crate::event::TrevKind;

/// Read-only aggregate counts over the events whose node resolved
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facets {
    pub by_node: BTreeMap<CompositeKey, usize>,
    pub by_node_type: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<TrevKind, usize>,
    /// Events left out because their node did not resolve
    pub skipped: usize,
}

impl Facets {
    pub(crate) fn count(&mut self, key: &CompositeKey, node_type: &str, kind: TrevKind) {
        *self.by_node.entry(key.clone()).or_insert(0) += 1;
        *self.by_node_type.entry(node_type.to_string()).or_insert(0) += 1;
        *self.by_kind.entry(kind).or_insert(0) += 1;
    }

    /// Number of events counted
    pub fn total(&self) -> usize {
        self.by_kind.values().sum()
    }

    pub fn kind_count(&self, kind: TrevKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Busiest nodes, by count descending then key
    pub fn top_nodes(&self, limit: usize) -> Vec<(&CompositeKey, usize)> {
        top(&self.by_node, limit)
    }

    /// Busiest node types, by count descending then name
    pub fn top_types(&self, limit: usize) -> Vec<(&String, usize)> {
        top(&self.by_node_type, limit)
    }
}

fn top<K: Ord>(counts: &BTreeMap<K, usize>, limit: usize) -> Vec<(&K, usize)> {
    let mut entries: Vec<(&K, usize)> = counts.iter().map(|(k, &v)| (k, v)).collect();
    // Stable sort keeps BTreeMap key order among equal counts
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(limit);
    entries
}
