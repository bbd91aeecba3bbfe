//! Composite node keys: `percentEncode(unit_id) + ":" + node_id`
//!
//! The unit id is percent-encoded with the encodeURIComponent unreserved set,
//! so the separator never appears inside the encoded part and decoding yields
//! back the exact `(unit_id, node_id)` pair.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use crate::error::{Result, TrevError};

/// Separator between the encoded unit id and the node id
pub const KEY_SEPARATOR: char = ':';

/// Uniquely identifies a node across all registered units
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey(String);

impl CompositeKey {
    pub fn new(unit_id: &str, node_id: NodeId) -> Self {
        Self(format!("{}{}{}", percent_encode(unit_id), KEY_SEPARATOR, node_id))
    }

    /// Parse an encoded key; only the canonical encoding of its parts is
    /// accepted (uppercase escapes, no escapable raw bytes, plain node id)
    pub fn parse(key: &str) -> Result<Self> {
        let (unit_id, node_id) = decode(key)?;
        let canonical = Self::new(&unit_id, node_id);
        if canonical.0 != key {
            return Err(TrevError::InvalidCompositeKey {
                key: key.to_string(),
            });
        }
        Ok(canonical)
    }

    /// Decode back into `(unit_id, node_id)`
    pub fn parts(&self) -> Result<(String, NodeId)> {
        decode(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CompositeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn decode(key: &str) -> Result<(String, NodeId)> {
    let invalid = || TrevError::InvalidCompositeKey {
        key: key.to_string(),
    };
    let (unit, node) = key.rsplit_once(KEY_SEPARATOR).ok_or_else(invalid)?;
    if unit.contains(KEY_SEPARATOR) {
        return Err(invalid());
    }
    let node_id = node.parse::<NodeId>().map_err(|_| invalid())?;
    let unit_id = percent_decode(unit).ok_or_else(invalid)?;
    Ok((unit_id, node_id))
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

/// encodeURIComponent-compatible percent encoding
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Inverse of [`percent_encode`]; `None` on malformed escapes or non-UTF-8 output
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            // from_str_radix alone would accept a leading '+'
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
