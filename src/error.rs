// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! Trev Error Types with Error Codes
//!
//! Error code ranges:
//! - TREV-000-009: Node index errors (missing/duplicate ids, unknown units)
//! - TREV-010-019: Resolution errors (unresolved nodes, broken parent chains)
//! - TREV-020-029: Structure errors (id copy between mismatched trees)
//! - TREV-030-039: Source text errors
//! - TREV-040-049: Composite key errors
//! - TREV-090-099: IO, persistence and config errors

use thiserror::Error;

use crate::ast::NodeId;
use crate::event::TrevId;

pub type Result<T> = std::result::Result<T, TrevError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum TrevError {
    // ═══════════════════════════════════════════
    // NODE INDEX ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[TREV-001] Node #{ordinal} ({node_type}) in unit '{unit_id}' has no id")]
    MissingNodeId {
        unit_id: String,
        node_type: String,
        /// Pre-order position of the offending node
        ordinal: usize,
    },

    #[error("[TREV-002] Node id {node_id} is assigned twice in unit '{unit_id}'")]
    DuplicateNodeId { unit_id: String, node_id: NodeId },

    #[error("[TREV-003] Unit '{unit_id}' is not registered")]
    UnknownUnit { unit_id: String },

    // ═══════════════════════════════════════════
    // RESOLUTION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[TREV-010] Event {event_id} references unknown node {node_id} in unit '{unit_id}'")]
    UnresolvedNode {
        event_id: TrevId,
        unit_id: String,
        node_id: NodeId,
    },

    #[error("[TREV-011] Event {event_id} has parent {parent_id} which is not in the store")]
    InvalidParent { event_id: TrevId, parent_id: TrevId },

    #[error("[TREV-012] Parent chain of event {event_id} loops back on itself")]
    ParentCycle { event_id: TrevId },

    // ═══════════════════════════════════════════
    // STRUCTURE ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[TREV-020] Node count mismatch: expected {expected}, got {actual}")]
    NodeCountMismatch { expected: usize, actual: usize },

    #[error("[TREV-021] Node type mismatch at #{position}: expected '{expected}', got '{actual}'")]
    NodeTypeMismatch {
        position: usize,
        expected: String,
        actual: String,
    },

    // ═══════════════════════════════════════════
    // SOURCE ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[TREV-030] Range {start}..{end} is outside the source of unit '{unit_id}' ({len} bytes)")]
    OutOfRange {
        unit_id: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("[TREV-031] Unit '{unit_id}' was registered without source text")]
    MissingSourceText { unit_id: String },

    // ═══════════════════════════════════════════
    // KEY ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[TREV-040] Invalid composite key: '{key}'")]
    InvalidCompositeKey { key: String },

    // ═══════════════════════════════════════════
    // IO / PERSISTENCE / CONFIG ERRORS (090-099)
    // ═══════════════════════════════════════════
    #[error("[TREV-090] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[TREV-091] JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("[TREV-092] Trace line {line} is malformed: {reason}")]
    TraceLine { line: usize, reason: String },

    #[error("[TREV-093] Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("[TREV-094] Invalid trace name: {reason}")]
    InvalidTraceName { reason: String },
}

impl TrevError {
    /// Error code (e.g. "TREV-010")
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingNodeId { .. } => "TREV-001",
            Self::DuplicateNodeId { .. } => "TREV-002",
            Self::UnknownUnit { .. } => "TREV-003",
            Self::UnresolvedNode { .. } => "TREV-010",
            Self::InvalidParent { .. } => "TREV-011",
            Self::ParentCycle { .. } => "TREV-012",
            Self::NodeCountMismatch { .. } => "TREV-020",
            Self::NodeTypeMismatch { .. } => "TREV-021",
            Self::OutOfRange { .. } => "TREV-030",
            Self::MissingSourceText { .. } => "TREV-031",
            Self::InvalidCompositeKey { .. } => "TREV-040",
            Self::Io(_) => "TREV-090",
            Self::Json(_) => "TREV-091",
            Self::TraceLine { .. } => "TREV-092",
            Self::ConfigError { .. } => "TREV-093",
            Self::InvalidTraceName { .. } => "TREV-094",
        }
    }
}

impl FixSuggestion for TrevError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            TrevError::MissingNodeId { .. } => {
                Some("Assign sequential ids to every node before registering the unit")
            }
            TrevError::DuplicateNodeId { .. } => Some("Node ids must be unique within a unit"),
            TrevError::UnknownUnit { .. } => Some("Register the unit before querying it"),
            TrevError::UnresolvedNode { .. } => {
                Some("Make sure the trace contains the unit registration the event points at")
            }
            TrevError::InvalidParent { .. } => {
                Some("The trace is truncated or was filtered before resolving; resolve the full trace")
            }
            TrevError::ParentCycle { .. } => Some("The trace file is corrupted; re-record it"),
            TrevError::NodeCountMismatch { .. } | TrevError::NodeTypeMismatch { .. } => {
                Some("Both trees must come from the same source; re-parse the instrumented output")
            }
            TrevError::OutOfRange { .. } => Some("Node spans must lie within the unit's source text"),
            TrevError::MissingSourceText { .. } => {
                Some("Register the unit with its source text to slice code by span")
            }
            TrevError::InvalidCompositeKey { .. } => Some("Use format: <percent-encoded unit id>:<node id>"),
            TrevError::Io(_) => Some("Check file path and permissions"),
            TrevError::Json(_) => Some("Check the trace payload is valid JSON"),
            TrevError::TraceLine { .. } => {
                Some("Each line must be a unit registration (with `unit`) or an event")
            }
            TrevError::ConfigError { .. } => Some("Check trev.yaml syntax"),
            TrevError::InvalidTraceName { .. } => {
                Some("Use alphanumeric characters, hyphens and underscores only")
            }
        }
    }
}
