use std::collections::BTreeMap;

use base64::Engine;
use chrono::{DateTime, FixedOffset};

/// A decoded row value, after pseudotype normalization.
///
/// This is JSON plus the two native pseudotypes the server can send:
/// timestamps and binary blobs.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Datum {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Datum>),
    Object(BTreeMap<String, Datum>),
    Time(DateTime<FixedOffset>),
    Binary(Vec<u8>),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Short type name used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Number(_) => "number",
            Datum::String(_) => "string",
            Datum::Array(_) => "array",
            Datum::Object(_) => "object",
            Datum::Time(_) => "time",
            Datum::Binary(_) => "binary",
        }
    }

    /// Convert back to plain JSON.
    ///
    /// Times become RFC 3339 strings and binary becomes standard base64, which
    /// is what chrono's and most serde byte helpers accept on the way back in.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Datum::Null => serde_json::Value::Null,
            Datum::Bool(b) => serde_json::Value::Bool(b),
            Datum::Number(n) => serde_json::Value::Number(n),
            Datum::String(s) => serde_json::Value::String(s),
            Datum::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Datum::into_json).collect())
            }
            Datum::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
            Datum::Time(t) => serde_json::Value::String(t.to_rfc3339()),
            Datum::Binary(bytes) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(bytes),
            ),
        }
    }
}

impl From<serde_json::Value> for Datum {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Datum::Null,
            serde_json::Value::Bool(b) => Datum::Bool(b),
            serde_json::Value::Number(n) => Datum::Number(n),
            serde_json::Value::String(s) => Datum::String(s),
            serde_json::Value::Array(items) => {
                Datum::Array(items.into_iter().map(Datum::from).collect())
            }
            serde_json::Value::Object(map) => {
                Datum::Object(map.into_iter().map(|(k, v)| (k, Datum::from(v))).collect())
            }
        }
    }
}
