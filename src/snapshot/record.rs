//! Snapshot records: one key per line.

use serde::Serialize;
use serde_json::Value;

use super::value::{KeyType, KeyValue};
use crate::error::{Result, SnapError};

/// Fields every record line must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["type", "key", "value", "ttl"];

/// Largest TTL the store accepts; it keeps expiry times in milliseconds.
pub const MAX_TTL: i64 = i64::MAX / 1000;

/// One key's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub key: String,
    pub value: KeyValue,
    /// Remaining seconds to live at snapshot time; `None` never expires.
    pub ttl: Option<i64>,
}

impl Record {
    #[must_use]
    pub fn new(key: impl Into<String>, value: KeyValue, ttl: Option<i64>) -> Self {
        Self {
            key_type: value.key_type(),
            key: key.into(),
            value,
            ttl,
        }
    }

    /// Encode as a single `\n`-terminated JSON line.
    pub fn encode(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Build a typed record from a decoded line.
    ///
    /// The value should already have passed [`is_well_formed`].
    ///
    /// # Errors
    ///
    /// - [`SnapError::UnsupportedType`] if `type` names no supported type
    /// - [`SnapError::InvalidRecord`] if `key`, `value` or `ttl` has the
    ///   wrong shape, or `ttl` lies outside `0..=MAX_TTL`
    pub fn from_json(value: &Value) -> Result<Self> {
        let key = value
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| SnapError::InvalidRecord("key must be a string".to_string()))?;

        let type_tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SnapError::InvalidRecord("type must be a string".to_string()))?;
        let key_type: KeyType = type_tag.parse().map_err(|_| SnapError::UnsupportedType {
            key: Some(key.to_string()),
            type_tag: type_tag.to_string(),
        })?;

        let ttl = match value.get("ttl") {
            None | Some(Value::Null) => None,
            Some(ttl) => {
                let seconds = ttl.as_i64().ok_or_else(|| {
                    SnapError::InvalidRecord(format!("ttl must be an integer or null, got {ttl}"))
                })?;
                if !(0..=MAX_TTL).contains(&seconds) {
                    return Err(SnapError::InvalidRecord(format!(
                        "ttl {seconds} is outside 0..={MAX_TTL}"
                    )));
                }
                Some(seconds)
            }
        };

        let value = KeyValue::from_json(key_type, value.get("value").unwrap_or(&Value::Null))?;

        Ok(Self {
            key_type,
            key: key.to_string(),
            value,
            ttl,
        })
    }
}

/// Decode one line into a JSON value.
pub fn decode(line: &str) -> std::result::Result<Value, serde_json::Error> {
    serde_json::from_str(line)
}

/// A record is well-formed iff it is an object carrying all of
/// [`REQUIRED_FIELDS`]. Whether its type is supported is not checked here.
#[must_use]
pub fn is_well_formed(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| REQUIRED_FIELDS.iter().all(|f| obj.contains_key(*f)))
}
