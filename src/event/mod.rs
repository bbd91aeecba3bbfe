//! Event Module - recording trace events
//!
//! Key types:
//! - `Trev`: Single recorded event (id, parent, kind, node reference, data)
//! - `EventRecorder`: Context-stack state machine assigning ids and parents
//! - `TraceListener`: Trait for sinks notified by the recorder
//! - `NoopListener`: Zero-cost no-op for testing
//! - `EventCollector`: In-memory sink that builds an `EventStore`
//! - `NdjsonSink` / `TraceWriter`: NDJSON trace writers

mod listener;
mod recorder;
mod trace;
mod trev;

// Re-export all public types
pub use listener::{EventCollector, NoopListener, TraceListener};
pub use recorder::EventRecorder;
pub use trace::{
    list_traces, load_trace, read_ndjson, NdjsonSink, TraceInfo, TraceLine, TraceWriter,
    TRACE_EXTENSION,
};
pub use trev::{NodeRef, StackEffect, Trev, TrevId, TrevKind};
