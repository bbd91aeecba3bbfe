//! Syntax nodes handed over by the transformer, and their indexed form.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::key::CompositeKey;

/// Unit-local sequential node id
pub type NodeId = u32;

/// Byte offsets of a node in its unit's source text (half-open)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A syntax tree node as produced by the transformer.
///
/// The transformer assigns `id` before registration; the index never
/// mutates this tree, it builds [`IndexedNode`]s next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a node without an id
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            id: None,
            node_type: node_type.into(),
            span: None,
            code: None,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some(Span::new(start, end));
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Pre-order traversal (iterative, safe for deep trees)
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Number of nodes in this subtree, including self
    pub fn size(&self) -> usize {
        self.walk().count()
    }

    /// Assign sequential ids in pre-order, starting at `first`.
    ///
    /// Returns the next unused id.
    pub fn assign_ids(&mut self, first: NodeId) -> NodeId {
        let mut next = first;
        let mut stack: Vec<&mut Node> = vec![self];
        while let Some(node) = stack.pop() {
            node.id = Some(next);
            next += 1;
            stack.extend(node.children.iter_mut().rev());
        }
        next
    }
}

/// Pre-order iterator over a [`Node`] tree
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A registered node: the transformer's fields plus what the index derives
/// (owning unit, composite key, tree links by id).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedNode {
    pub id: NodeId,
    pub node_type: String,
    pub span: Option<Span>,
    pub code: Option<String>,
    pub unit_id: Arc<str>,
    pub key: CompositeKey,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl IndexedNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::new("Program")
            .child(
                Node::new("ExpressionStatement")
                    .child(Node::new("Identifier"))
                    .child(Node::new("NumericLiteral")),
            )
            .child(Node::new("ReturnStatement"))
    }

    #[test]
    fn walk_is_pre_order() {
        let tree = sample();
        let types: Vec<&str> = tree.walk().map(|n| n.node_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "Program",
                "ExpressionStatement",
                "Identifier",
                "NumericLiteral",
                "ReturnStatement"
            ]
        );
        assert_eq!(tree.size(), 5);
    }

    #[test]
    fn assign_ids_is_sequential_in_pre_order() {
        let mut tree = sample();
        let next = tree.assign_ids(1);
        assert_eq!(next, 6);
        let ids: Vec<Option<NodeId>> = tree.walk().map(|n| n.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3), Some(4), Some(5)]);
    }

    #[test]
    fn node_serializes_compactly() {
        let node = Node::new("NumericLiteral").with_id(3).with_code("123");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "NumericLiteral");
        assert_eq!(json["id"], 3);
        assert!(json.get("children").is_none());
        assert!(json.get("span").is_none());

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn walk_handles_deep_trees() {
        let mut tree = Node::new("Leaf");
        for _ in 0..50_000 {
            tree = Node::new("Wrapper").child(tree);
        }
        assert_eq!(tree.walk().count(), 50_001);
        // Dropping a 50k-deep tree recursively can overflow; unwind it first.
        let mut cursor = Some(tree);
        while let Some(mut node) = cursor {
            cursor = node.children.pop();
        }
    }
}
