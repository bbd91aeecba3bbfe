//! Trev - execution trace recorder and query engine
//!
//! Records what an instrumented program does (evaluated expressions, calls,
//! returns, throws, suspends, resumes) as call-stack-structured events tied
//! to the syntax node that produced them, and queries those traces later.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  ast/       Syntax trees, composite keys, NodeIndex          │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RECORDING                             │
//! │  event/     Trev, EventRecorder, listeners, NDJSON traces    │
//! │  encode/    Value encoders (shared-value back-references)     │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         QUERYING                             │
//! │  store/     EventStore, resolution, facets, payloads         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`ast`] | Node trees from the transformer, `NodeIndex`, `copy_node_ids` |
//! | [`event`] | Id assignment and call-stack parentage, trace sinks |
//! | [`encode`] | `ValueEncoder` contract for event data |
//! | [`store`] | Immutable event stores, denormalized views, `Facets` |
//! | [`config`] | CLI configuration (YAML + env overrides) |
//! | [`error`] | Error types with fix suggestions |

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL
// ═══════════════════════════════════════════════════════════════
pub mod ast;

// ═══════════════════════════════════════════════════════════════
// RECORDING
// ═══════════════════════════════════════════════════════════════
pub mod encode;
pub mod event;

// ═══════════════════════════════════════════════════════════════
// QUERYING
// ═══════════════════════════════════════════════════════════════
pub mod store;

// ═══════════════════════════════════════════════════════════════
// SUPPORT
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// Re-exports for convenience
pub use ast::{copy_node_ids, CompositeKey, IndexedNode, Node, NodeId, NodeIndex, SourceUnit, Span};
pub use config::TrevConfig;
pub use encode::{JsonEncoder, SharedValueEncoder, ValueEncoder};
pub use error::{FixSuggestion, Result, TrevError};
pub use event::{
    EventCollector, EventRecorder, NdjsonSink, NodeRef, NoopListener, TraceListener, TraceWriter,
    Trev, TrevId, TrevKind,
};
pub use store::{EventStore, Facets, ResolvedTrev, TracePayload, UnitRecord};
