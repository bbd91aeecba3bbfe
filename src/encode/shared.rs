//! Identity-aware encoding of shared values.
//!
//! The first time an allocation is seen it is encoded inline under a fresh
//! id; every later encode of the same allocation in this session is a
//! back-reference. Seen `Arc`s are retained until [`SharedValueEncoder::reset`]
//! so an address cannot be reused by a different value mid-session.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{encode_error, ValueEncoder};

/// Field holding the id of an inline-encoded shared value
pub const ID_FIELD: &str = "$id";
/// Field holding the id of an earlier encoded shared value
pub const REF_FIELD: &str = "$ref";

pub struct SharedValueEncoder<T: ?Sized> {
    next_id: u64,
    seen: FxHashMap<usize, u64>,
    retained: Vec<Arc<T>>,
}

impl<T: ?Sized> SharedValueEncoder<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            seen: FxHashMap::default(),
            retained: Vec::new(),
        }
    }

    /// Number of distinct allocations encoded so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Start a new session: ids restart at 1 and retained values are released
    pub fn reset(&mut self) {
        self.next_id = 1;
        self.seen.clear();
        self.retained.clear();
    }
}

impl<T: ?Sized> Default for SharedValueEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + ?Sized> ValueEncoder<Arc<T>> for SharedValueEncoder<T> {
    fn encode(&mut self, value: &Arc<T>) -> Value {
        let addr = Arc::as_ptr(value).cast::<()>() as usize;
        if let Some(&id) = self.seen.get(&addr) {
            let mut reference = Map::new();
            reference.insert(REF_FIELD.to_string(), Value::from(id));
            return Value::Object(reference);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.seen.insert(addr, id);
        self.retained.push(Arc::clone(value));

        let inner = serde_json::to_value(&**value).unwrap_or_else(|e| encode_error(&e));
        let mut inline = Map::new();
        inline.insert(ID_FIELD.to_string(), Value::from(id));
        inline.insert("value".to_string(), inner);
        Value::Object(inline)
    }
}

impl<T: ?Sized> std::fmt::Debug for SharedValueEncoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedValueEncoder")
            .field("next_id", &self.next_id)
            .field("seen", &self.seen.len())
            .finish()
    }
}
