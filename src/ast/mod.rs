//! AST Module - syntax trees of traced programs
//!
//! Contains the node side of a trace:
//! - `node`: `Node` (transformer output), `IndexedNode`, `Span`
//! - `key`: `CompositeKey` and its percent-encoding
//! - `flat`: pre-order list form used when a unit is persisted
//! - `index`: `NodeIndex`, `SourceUnit`
//! - `copy_ids`: id transfer between two parses of the same program
//!
//! Events reference nodes by `(unit_id, node_id)`; this module is what
//! turns that pair back into a node.

mod copy_ids;
pub mod flat;
mod index;
mod key;
mod node;

// Re-export all public types
pub use copy_ids::copy_node_ids;
pub use flat::FlatNode;
pub use index::{NodeIndex, SourceUnit};
pub use key::{percent_decode, percent_encode, CompositeKey, KEY_SEPARATOR};
pub use node::{IndexedNode, Node, NodeId, Span, Walk};
