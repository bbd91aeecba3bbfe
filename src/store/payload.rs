//! Whole-trace JSON payload

use serde::{Deserialize, Serialize};

use crate::ast::Node;
use crate::event::Trev;

/// A unit registration as persisted: also the shape of an NDJSON unit line.
///
/// `unit` is written as a flat pre-order list (see [`crate::ast::flat`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    pub unit_id: String,
    #[serde(with = "crate::ast::flat")]
    pub unit: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

/// Serialized store: units in registration order, each keyed by its
/// `unitId`, followed by the raw events (no derived fields).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TracePayload {
    pub units: Vec<UnitRecord>,
    pub events: Vec<Trev>,
}

impl TracePayload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
