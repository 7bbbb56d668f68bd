//! Structured detail payloads attached to audit events
//!
//! Details are a string-keyed ordered map of primitive, list and nested map
//! values. Keys are kept sorted so the serialized form is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detail map attached to an [`AuditEvent`](super::AuditEvent)
pub type AuditDetails = BTreeMap<String, DetailValue>;

/// A single value inside [`AuditDetails`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<DetailValue>),
    Map(BTreeMap<String, DetailValue>),
}

impl DetailValue {
    /// Decode a captured HTTP body
    ///
    /// JSON bodies keep their structure, other UTF-8 bodies become text,
    /// anything else is recorded as a byte count.
    pub fn from_body(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Null;
        }
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
            return Self::from(value);
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Text(format!("<{} bytes of binary data>", bytes.len())),
        }
    }

    /// Marker for a body longer than the capture limit
    ///
    /// `{"truncated": true, "capturedBytes": N, "preview": ...}` where the
    /// preview is decoded like [`from_body`](Self::from_body).
    pub fn truncated_body(preview: &[u8]) -> Self {
        let mut map = BTreeMap::new();
        map.insert("truncated".to_string(), Self::Bool(true));
        map.insert(
            "capturedBytes".to_string(),
            Self::Integer(i64::try_from(preview.len()).unwrap_or(i64::MAX)),
        );
        map.insert("preview".to_string(), Self::from_body(preview));
        Self::Map(map)
    }
}

impl From<serde_json::Value> for DetailValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                // u64 beyond i64 and non-integers
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for DetailValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
