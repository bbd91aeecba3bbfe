//! Copy node ids between two parses of the same program.
//!
//! Used when the instrumented output is re-parsed: the fresh tree must carry
//! the ids the original tree was registered with.

use super::node::Node;
use crate::error::{Result, TrevError};

/// Walk both trees in lockstep (pre-order) and copy each node's id from
/// `from` onto `to`.
///
/// Nothing is written unless both trees have the same node count and the
/// same type tag at every position.
pub fn copy_node_ids(from: &Node, to: &mut Node) -> Result<()> {
    let expected = from.size();
    let actual = to.size();
    if expected != actual {
        return Err(TrevError::NodeCountMismatch { expected, actual });
    }

    for (position, (a, b)) in from.walk().zip(to.walk()).enumerate() {
        if a.node_type != b.node_type {
            return Err(TrevError::NodeTypeMismatch {
                position,
                expected: a.node_type.clone(),
                actual: b.node_type.clone(),
            });
        }
    }

    let mut ids = from.walk().map(|n| n.id);
    let mut stack: Vec<&mut Node> = vec![to];
    while let Some(node) = stack.pop() {
        node.id = ids.next().flatten();
        stack.extend(node.children.iter_mut().rev());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Node {
        Node::new("Program")
            .child(Node::new("VariableDeclaration").child(Node::new("Identifier")))
            .child(Node::new("ReturnStatement"))
    }

    #[test]
    fn copies_ids_in_lockstep() {
        let mut from = tree();
        from.assign_ids(10);
        let mut to = tree();

        copy_node_ids(&from, &mut to).unwrap();
        assert_eq!(to, from);
    }

    #[test]
    fn count_mismatch_fails_without_writing() {
        let mut from = tree();
        from.assign_ids(1);
        let mut to = tree().child(Node::new("EmptyStatement"));

        let err = copy_node_ids(&from, &mut to).unwrap_err();
        assert!(matches!(
            err,
            TrevError::NodeCountMismatch {
                expected: 4,
                actual: 5
            }
        ));
        assert!(to.walk().all(|n| n.id.is_none()));
    }

    #[test]
    fn type_mismatch_reports_position() {
        let mut from = tree();
        from.assign_ids(1);
        let mut to = Node::new("Program")
            .child(Node::new("VariableDeclaration").child(Node::new("Literal")))
            .child(Node::new("ReturnStatement"));

        let err = copy_node_ids(&from, &mut to).unwrap_err();
        match err {
            TrevError::NodeTypeMismatch {
                position,
                expected,
                actual,
            } => {
                assert_eq!(position, 2);
                assert_eq!(expected, "Identifier");
                assert_eq!(actual, "Literal");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(to.walk().all(|n| n.id.is_none()));
    }
}
