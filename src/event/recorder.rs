//! EventRecorder - single-execution state machine driven by instrumented code
//!
//! Assigns ids and call-stack parentage via an explicit open/close protocol.
//! One recorder per traced execution; it is not shared across executions.

use std::sync::Arc;

use serde_json::Value;

use super::listener::TraceListener;
use super::trev::{NodeRef, StackEffect, Trev, TrevId, TrevKind};
use crate::ast::Node;

/// Records events for one traced execution
pub struct EventRecorder {
    next_id: TrevId,
    /// Ids of open CallStart/Resume events, innermost last
    context: Vec<TrevId>,
    listeners: Vec<Arc<dyn TraceListener>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            context: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Builder-style [`attach`](Self::attach)
    pub fn with_listener(mut self, listener: Arc<dyn TraceListener>) -> Self {
        self.attach(listener);
        self
    }

    /// Listeners are notified in attachment order
    pub fn attach(&mut self, listener: Arc<dyn TraceListener>) {
        self.listeners.push(listener);
    }

    /// Forward a unit registration to every listener
    pub fn register_unit(&self, unit_id: &str, root: &Node, source_text: Option<&str>) {
        for listener in &self.listeners {
            listener.on_unit_registered(unit_id, root, source_text);
        }
    }

    /// Record an event with an explicit stack effect.
    ///
    /// A close pops before the parent is read, so an open and its matching
    /// close share the same parent. Closing an empty stack is a no-op.
    pub fn record(
        &mut self,
        kind: TrevKind,
        node: &NodeRef,
        data: Value,
        effect: StackEffect,
    ) -> TrevId {
        self.record_event(kind, node, data, effect, None)
    }

    fn record_event(
        &mut self,
        kind: TrevKind,
        node: &NodeRef,
        data: Value,
        effect: StackEffect,
        resume_of: Option<TrevId>,
    ) -> TrevId {
        let id = self.next_id;
        self.next_id += 1;

        if effect == StackEffect::Close && self.context.pop().is_none() {
            tracing::warn!(event_id = id, kind = %kind, "Close recorded with no open event");
        }

        let event = Trev {
            id,
            parent_id: self.context.last().copied(),
            kind,
            unit_id: Arc::clone(&node.unit_id),
            node_id: node.node_id,
            data,
            resume_of,
        };

        for listener in &self.listeners {
            listener.on_event(&event);
        }

        if effect == StackEffect::Open {
            self.context.push(id);
        }
        id
    }

    pub fn expression(&mut self, node: &NodeRef, value: Value) -> TrevId {
        self.record(TrevKind::Expression, node, value, StackEffect::None)
    }

    pub fn call_start(&mut self, node: &NodeRef, args: Value) -> TrevId {
        self.record(TrevKind::CallStart, node, args, StackEffect::Open)
    }

    pub fn call_return(&mut self, node: &NodeRef, value: Value) -> TrevId {
        self.record(TrevKind::CallReturn, node, value, StackEffect::Close)
    }

    pub fn call_throw(&mut self, node: &NodeRef, error: Value) -> TrevId {
        self.record(TrevKind::CallThrow, node, error, StackEffect::Close)
    }

    pub fn suspend(&mut self, node: &NodeRef, value: Value) -> TrevId {
        self.record(TrevKind::Suspend, node, value, StackEffect::Close)
    }

    /// Continue after a pause; `resume_of` is the CallStart/Suspend id
    pub fn resume(&mut self, node: &NodeRef, value: Value, resume_of: TrevId) -> TrevId {
        self.record_event(
            TrevKind::Resume,
            node,
            value,
            StackEffect::Open,
            Some(resume_of),
        )
    }

    /// Id the next event will get
    pub fn next_id(&self) -> TrevId {
        self.next_id
    }

    /// Number of open events
    pub fn depth(&self) -> usize {
        self.context.len()
    }

    pub fn current_parent(&self) -> Option<TrevId> {
        self.context.last().copied()
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("next_id", &self.next_id)
            .field("depth", &self.context.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
