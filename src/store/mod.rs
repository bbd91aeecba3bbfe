//! Store Module - queryable collections of recorded events
//!
//! Immutable stores with a denormalized (resolved) view on demand.
//!
//! Key types:
//! - `EventStore`: Ordered events plus the node index they reference
//! - `ResolvedTrev`: Event joined with its node and ancestor chain
//! - `Facets`: Occurrence counts by node, node type and kind
//! - `TracePayload`: Serialized form (units + raw events)

mod event_store;
mod facets;
mod payload;

// Re-export all public types
pub use event_store::{AncestorChain, EventStore, ResolvedTrev};
pub use facets::Facets;
pub use payload::{TracePayload, UnitRecord};
