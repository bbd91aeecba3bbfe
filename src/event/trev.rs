//! Trace events ("trevs")

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ast::NodeId;

/// Event id: positive, assigned sequentially by the recorder
pub type TrevId = u64;

/// What happened at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrevKind {
    /// Value of an evaluated sub-expression
    Expression,
    /// Entering a callable body
    CallStart,
    /// Normal return from a callable
    CallReturn,
    /// Error propagating out of a callable
    CallThrow,
    /// Cooperative pause (yield/await)
    Suspend,
    /// Continuing after a pause
    Resume,
}

/// How recording an event changes the recorder's context stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEffect {
    None,
    Open,
    Close,
}

impl TrevKind {
    pub const ALL: [TrevKind; 6] = [
        Self::Expression,
        Self::CallStart,
        Self::CallReturn,
        Self::CallThrow,
        Self::Suspend,
        Self::Resume,
    ];

    pub fn stack_effect(self) -> StackEffect {
        match self {
            Self::Expression => StackEffect::None,
            Self::CallStart | Self::Resume => StackEffect::Open,
            Self::CallReturn | Self::CallThrow | Self::Suspend => StackEffect::Close,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expression => "expression",
            Self::CallStart => "call_start",
            Self::CallReturn => "call_return",
            Self::CallThrow => "call_throw",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
        }
    }
}

impl fmt::Display for TrevKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrevKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown event kind '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Reference from an event to the node that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub unit_id: Arc<str>,
    pub node_id: NodeId,
}

impl NodeRef {
    pub fn new(unit_id: impl Into<Arc<str>>, node_id: NodeId) -> Self {
        Self {
            unit_id: unit_id.into(),
            node_id,
        }
    }
}

/// Single recorded trace event. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trev {
    pub id: TrevId,
    /// Enclosing event (top of the context stack when recorded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TrevId>,
    pub kind: TrevKind,
    pub unit_id: Arc<str>,
    pub node_id: NodeId,
    /// Pre-encoded, JSON-safe value
    #[serde(default)]
    pub data: Value,
    /// Resume only: the CallStart/Suspend being continued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_of: Option<TrevId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stack_effects_follow_kind_table() {
        assert_eq!(TrevKind::Expression.stack_effect(), StackEffect::None);
        assert_eq!(TrevKind::CallStart.stack_effect(), StackEffect::Open);
        assert_eq!(TrevKind::Resume.stack_effect(), StackEffect::Open);
        assert_eq!(TrevKind::CallReturn.stack_effect(), StackEffect::Close);
        assert_eq!(TrevKind::CallThrow.stack_effect(), StackEffect::Close);
        assert_eq!(TrevKind::Suspend.stack_effect(), StackEffect::Close);
    }

    #[test]
    fn kind_parses_from_its_name() {
        for kind in TrevKind::ALL {
            assert_eq!(kind.as_str().parse::<TrevKind>().unwrap(), kind);
        }
        assert!("return".parse::<TrevKind>().is_err());
    }

    #[test]
    fn trev_serializes_with_camel_case_fields() {
        let trev = Trev {
            id: 4,
            parent_id: Some(2),
            kind: TrevKind::Resume,
            unit_id: "main.js".into(),
            node_id: 7,
            data: json!({"value": 3}),
            resume_of: Some(3),
        };
        let json = serde_json::to_value(&trev).unwrap();
        assert_eq!(json["parentId"], 2);
        assert_eq!(json["kind"], "resume");
        assert_eq!(json["unitId"], "main.js");
        assert_eq!(json["resumeOf"], 3);

        let back: Trev = serde_json::from_value(json).unwrap();
        assert_eq!(back, trev);
    }

    #[test]
    fn root_trev_omits_optional_fields() {
        let trev = Trev {
            id: 1,
            parent_id: None,
            kind: TrevKind::Expression,
            unit_id: "main.js".into(),
            node_id: 1,
            data: Value::Null,
            resume_of: None,
        };
        let json = serde_json::to_value(&trev).unwrap();
        assert!(json.get("parentId").is_none());
        assert!(json.get("resumeOf").is_none());
        assert!(json.get("unit").is_none());
    }
}
