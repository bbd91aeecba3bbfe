//! Flat, pre-order persistence of node trees.
//!
//! A persisted unit is one list entry per node, each naming the list
//! position of its parent. JSON nesting stays constant however deep the
//! tree is, so units round-trip through `serde_json` without hitting its
//! recursion limit.
//!
//! Use with `#[serde(with = "crate::ast::flat")]` on a `Node` field. The
//! nested `Node` form is still accepted on input.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::node::{Node, NodeId, Span};

/// One node of a flattened tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// List position of the parent; absent only on the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
}

/// Flatten `root` in pre-order
pub fn flatten(root: &Node) -> Vec<FlatNode> {
    let mut out = Vec::with_capacity(root.size());
    let mut stack: Vec<(&Node, Option<usize>)> = vec![(root, None)];

    while let Some((node, parent)) = stack.pop() {
        let position = out.len();
        out.push(FlatNode {
            id: node.id,
            node_type: node.node_type.clone(),
            span: node.span,
            code: node.code.clone(),
            parent,
        });
        for child in node.children.iter().rev() {
            stack.push((child, Some(position)));
        }
    }
    out
}

/// Rebuild a tree from its flat form.
///
/// Children keep the order in which they appear in the list. Fails when the
/// list is empty, when the first entry has a parent, or when any other entry
/// lacks one or points at itself or a later entry.
pub fn unflatten(nodes: Vec<FlatNode>) -> Result<Node, String> {
    if nodes.is_empty() {
        return Err("flat tree has no nodes".to_string());
    }

    let count = nodes.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (position, node) in nodes.iter().enumerate() {
        match (position, node.parent) {
            (0, None) => {}
            (0, Some(_)) => return Err("flat tree root has a parent".to_string()),
            (_, None) => return Err(format!("flat tree node #{} has no parent", position)),
            (_, Some(parent)) if parent >= position => {
                return Err(format!(
                    "flat tree node #{} names parent #{} which does not precede it",
                    position, parent
                ))
            }
            (_, Some(parent)) => children[parent].push(position),
        }
    }

    // Parents precede children, so build back to front
    let mut built: Vec<Option<Node>> = vec![None; count];
    for (position, flat) in nodes.into_iter().enumerate().rev() {
        let kids = children[position]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[position] = Some(Node {
            id: flat.id,
            node_type: flat.node_type,
            span: flat.span,
            code: flat.code,
            children: kids,
        });
    }
    built[0]
        .take()
        .ok_or_else(|| "flat tree root was not rebuilt".to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Flat(Vec<FlatNode>),
    Tree(Node),
}

pub fn serialize<S: Serializer>(root: &Node, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(flatten(root))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Node, D::Error> {
    match Repr::deserialize(deserializer)? {
        Repr::Flat(nodes) => unflatten(nodes).map_err(D::Error::custom),
        Repr::Tree(node) => Ok(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ═══════════════════════════════════════════════════════════════
    // flatten / unflatten
    // ═══════════════════════════════════════════════════════════════

    fn sample() -> Node {
        let mut root = Node::new("Program")
            .with_span(0, 9)
            .child(
                Node::new("ExpressionStatement")
                    .child(Node::new("Identifier").with_code("x"))
                    .child(Node::new("NumericLiteral")),
            )
            .child(Node::new("EmptyStatement"));
        root.assign_ids(1);
        root
    }

    #[test]
    fn flatten_is_pre_order_with_parent_positions() {
        let flat = flatten(&sample());
        let shape: Vec<(&str, Option<usize>)> = flat
            .iter()
            .map(|n| (n.node_type.as_str(), n.parent))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("Program", None),
                ("ExpressionStatement", Some(0)),
                ("Identifier", Some(1)),
                ("NumericLiteral", Some(1)),
                ("EmptyStatement", Some(0)),
            ]
        );
        assert_eq!(flat[2].code.as_deref(), Some("x"));
        assert_eq!(flat[0].span, Some(Span::new(0, 9)));
    }

    #[test]
    fn unflatten_restores_the_tree() {
        let root = sample();
        assert_eq!(unflatten(flatten(&root)).unwrap(), root);
    }

    #[test]
    fn unflatten_rejects_malformed_lists() {
        let node = |parent| FlatNode {
            id: None,
            node_type: "N".to_string(),
            span: None,
            code: None,
            parent,
        };

        assert!(unflatten(vec![]).is_err());
        assert!(unflatten(vec![node(Some(0))]).is_err());
        assert!(unflatten(vec![node(None), node(None)]).is_err());
        assert!(unflatten(vec![node(None), node(Some(1))]).is_err());
        assert!(unflatten(vec![node(None), node(Some(2)), node(Some(0))]).is_err());
        assert!(unflatten(vec![node(None), node(Some(0)), node(Some(1))]).is_ok());
    }

    // ═══════════════════════════════════════════════════════════════
    // serde
    // ═══════════════════════════════════════════════════════════════

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        unit: Node,
    }

    #[test]
    fn serde_writes_a_flat_list() {
        let json = serde_json::to_value(Wrapper {
            unit: Node::new("Program").with_id(1).child(Node::new("Identifier").with_id(2)),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"unit": [
                {"id": 1, "type": "Program"},
                {"id": 2, "type": "Identifier", "parent": 0}
            ]})
        );
    }

    #[test]
    fn serde_still_reads_nested_trees() {
        let parsed: Wrapper = serde_json::from_str(
            r#"{"unit":{"id":1,"type":"Program","children":[{"id":2,"type":"Identifier"}]}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.unit,
            Node::new("Program").with_id(1).child(Node::new("Identifier").with_id(2))
        );
    }

    #[test]
    fn serde_reports_bad_parent() {
        let err = serde_json::from_str::<Wrapper>(
            r#"{"unit":[{"type":"Program"},{"type":"Identifier","parent":5}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not precede"));
    }

    #[test]
    fn deep_chain_round_trips_through_json() {
        let depth = 5_000;
        let mut node = Node::new("Identifier");
        for _ in 0..depth {
            node = Node::new("UnaryExpression").child(node);
        }
        node.assign_ids(1);
        let original = Wrapper { unit: node };

        let json = serde_json::to_string(&original).unwrap();
        let parsed: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.unit.size(), depth + 1);
        assert!(parsed.unit.walk().map(|n| n.id).eq(original.unit.walk().map(|n| n.id)));

        unwind(original.unit);
        unwind(parsed.unit);
    }

    /// Drop a deep chain without recursing
    fn unwind(mut node: Node) {
        while let Some(child) = node.children.pop() {
            node = child;
        }
    }
}
