//! NodeIndex - registered source units and O(1) node lookup
//!
//! Each unit is indexed once at registration: nodes are flattened in
//! pre-order, stamped with their owning unit and composite key, and entered
//! into a `CompositeKey → node` map shared across all units.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::key::CompositeKey;
use super::node::{IndexedNode, Node, NodeId, Span};
use crate::error::{Result, TrevError};

/// One parsed/traced compilation unit
#[derive(Debug, Clone)]
pub struct SourceUnit {
    unit_id: Arc<str>,
    source_text: Option<String>,
    /// Pre-order; `nodes[0]` is the root
    nodes: Vec<IndexedNode>,
    positions: FxHashMap<NodeId, usize>,
}

impl SourceUnit {
    /// Validate ids and index every node under `root`
    pub fn build(unit_id: &str, root: &Node, source_text: Option<String>) -> Result<Self> {
        let unit_id: Arc<str> = Arc::from(unit_id);
        let mut nodes = Vec::new();
        let mut positions = FxHashMap::default();

        let mut stack: Vec<(&Node, Option<NodeId>)> = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            let id = node.id.ok_or_else(|| TrevError::MissingNodeId {
                unit_id: unit_id.to_string(),
                node_type: node.node_type.clone(),
                ordinal: nodes.len(),
            })?;
            if positions.insert(id, nodes.len()).is_some() {
                return Err(TrevError::DuplicateNodeId {
                    unit_id: unit_id.to_string(),
                    node_id: id,
                });
            }

            nodes.push(IndexedNode {
                id,
                node_type: node.node_type.clone(),
                span: node.span,
                code: node.code.clone(),
                unit_id: Arc::clone(&unit_id),
                key: CompositeKey::new(&unit_id, id),
                parent,
                // Children without ids fail when they are popped below
                children: node.children.iter().filter_map(|c| c.id).collect(),
            });
            stack.extend(node.children.iter().rev().map(|c| (c, Some(id))));
        }

        Ok(Self {
            unit_id,
            source_text,
            nodes,
            positions,
        })
    }

    pub fn id(&self) -> &str {
        &self.unit_id
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source_text.as_deref()
    }

    pub fn root(&self) -> &IndexedNode {
        &self.nodes[0]
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> &[IndexedNode] {
        &self.nodes
    }

    pub fn get(&self, node_id: NodeId) -> Option<&IndexedNode> {
        self.positions.get(&node_id).map(|&pos| &self.nodes[pos])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Slice the unit's source text by byte offsets
    pub fn slice(&self, span: Span) -> Result<&str> {
        let text = self
            .source_text
            .as_deref()
            .ok_or_else(|| TrevError::MissingSourceText {
                unit_id: self.unit_id.to_string(),
            })?;
        let out_of_range = || TrevError::OutOfRange {
            unit_id: self.unit_id.to_string(),
            start: span.start,
            end: span.end,
            len: text.len(),
        };
        if span.start > span.end || span.end > text.len() {
            return Err(out_of_range());
        }
        // Offsets splitting a UTF-8 sequence are outside any valid slice
        text.get(span.start..span.end).ok_or_else(out_of_range)
    }

    /// Code text of a node: explicit `code` first, else its span in the source.
    ///
    /// `Ok(None)` when the node has neither.
    pub fn code_of<'a>(&'a self, node: &'a IndexedNode) -> Result<Option<&'a str>> {
        if let Some(code) = node.code.as_deref() {
            return Ok(Some(code));
        }
        match (node.span, self.source_text.is_some()) {
            (Some(span), true) => self.slice(span).map(Some),
            _ => Ok(None),
        }
    }

    /// Rebuild the registered tree in the transformer's shape
    pub fn to_tree(&self) -> Node {
        let mut built: Vec<Option<Node>> = vec![None; self.nodes.len()];
        // Reverse pre-order visits every child before its parent
        for pos in (0..self.nodes.len()).rev() {
            let indexed = &self.nodes[pos];
            let children = indexed
                .children
                .iter()
                .filter_map(|id| self.positions.get(id))
                .filter_map(|&child| built[child].take())
                .collect();
            built[pos] = Some(Node {
                id: Some(indexed.id),
                node_type: indexed.node_type.clone(),
                span: indexed.span,
                code: indexed.code.clone(),
                children,
            });
        }
        built
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_else(|| Node::new(""))
    }
}

/// Index over all registered units
#[derive(Debug, Default)]
pub struct NodeIndex {
    /// Registration order
    units: Vec<SourceUnit>,
    slots: FxHashMap<Arc<str>, usize>,
    keys: FxHashMap<CompositeKey, (usize, usize)>,
}

impl NodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit; re-registering an id replaces the prior unit and
    /// its index entries, keeping its registration slot.
    pub fn add_unit(&mut self, unit_id: &str, root: &Node) -> Result<()> {
        self.add_unit_with_source(unit_id, root, None)
    }

    pub fn add_unit_with_source(
        &mut self,
        unit_id: &str,
        root: &Node,
        source_text: Option<String>,
    ) -> Result<()> {
        let unit = SourceUnit::build(unit_id, root, source_text)?;
        self.insert_unit(unit);
        Ok(())
    }

    fn insert_unit(&mut self, unit: SourceUnit) {
        let slot = match self.slots.get(unit.id()) {
            Some(&slot) => {
                for node in self.units[slot].nodes() {
                    self.keys.remove(&node.key);
                }
                tracing::debug!(unit_id = %unit.id(), "Replacing registered unit");
                slot
            }
            None => self.units.len(),
        };

        for (pos, node) in unit.nodes().iter().enumerate() {
            self.keys.insert(node.key.clone(), (slot, pos));
        }
        tracing::debug!(unit_id = %unit.id(), nodes = unit.len(), "Registered unit");

        if slot == self.units.len() {
            self.slots.insert(Arc::clone(&unit.unit_id), slot);
            self.units.push(unit);
        } else {
            self.units[slot] = unit;
        }
    }

    pub fn lookup(&self, unit_id: &str, node_id: NodeId) -> Option<&IndexedNode> {
        self.unit(unit_id)?.get(node_id)
    }

    pub fn lookup_by_key(&self, key: &str) -> Option<&IndexedNode> {
        self.keys
            .get(key)
            .map(|&(slot, pos)| &self.units[slot].nodes[pos])
    }

    /// All nodes matching `predicate`: units in registration order,
    /// nodes in pre-order within each unit.
    pub fn scan<F>(&self, mut predicate: F) -> Vec<&IndexedNode>
    where
        F: FnMut(&IndexedNode) -> bool,
    {
        self.units
            .iter()
            .flat_map(|unit| unit.nodes().iter())
            .filter(|node| predicate(*node))
            .collect()
    }

    pub fn unit(&self, unit_id: &str) -> Option<&SourceUnit> {
        self.slots.get(unit_id).map(|&slot| &self.units[slot])
    }

    /// Units in registration order
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.iter()
    }

    /// Code text of a registered node (see [`SourceUnit::code_of`])
    pub fn code_of<'a>(&'a self, node: &'a IndexedNode) -> Result<Option<&'a str>> {
        let unit = self.unit(&node.unit_id).ok_or_else(|| TrevError::UnknownUnit {
            unit_id: node.unit_id.to_string(),
        })?;
        unit.code_of(node)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn node_count(&self) -> usize {
        self.keys.len()
    }
}
