//! Encode Module - snapshotting runtime values into event data
//!
//! The recorder stores `data` already encoded; encoders are the seam where a
//! host runtime plugs its own type dispatch in. One encoder per traced
//! execution, passed explicitly next to its recorder.
//!
//! Key types:
//! - `ValueEncoder`: Trait turning a value into JSON-safe data
//! - `JsonEncoder`: Plain serde encoding, no identity tracking
//! - `SharedValueEncoder`: Encodes `Arc`s with `$id`/`$ref` back-references

mod shared;

use serde::Serialize;
use serde_json::{json, Value};

pub use shared::{SharedValueEncoder, ID_FIELD, REF_FIELD};

/// Turns a runtime value into JSON-safe event data without mutating it
pub trait ValueEncoder<T: ?Sized> {
    fn encode(&mut self, value: &T) -> Value;
}

/// Stateless serde encoder; values that fail to serialize become
/// `{"$error": "<reason>"}` so recording never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl<T: Serialize + ?Sized> ValueEncoder<T> for JsonEncoder {
    fn encode(&mut self, value: &T) -> Value {
        serde_json::to_value(value).unwrap_or_else(|e| encode_error(&e))
    }
}

pub(crate) fn encode_error(e: &serde_json::Error) -> Value {
    tracing::debug!(error = %e, "Value could not be encoded");
    json!({ "$error": e.to_string() })
}
