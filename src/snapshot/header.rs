//! Snapshot header: the first line of every snapshot file.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{HeaderError, Result};

/// Describes the file layout.
pub const FORMAT_TAG: &str = "LF separated JSON";

/// The only store flavor this tool can restore.
pub const BACKUP_KIND: &str = "redis";

/// Snapshot metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub tool_version: String,
    pub format_tag: String,
    pub backup_kind: String,
    /// When the snapshot was started (UTC).
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Whether records are in lexicographic key order.
    pub sorted: bool,
    /// Store section of the source configuration, echoed verbatim.
    pub store_config: Value,
}

/// Version string recorded in headers written by this build.
#[must_use]
pub fn tool_version() -> String {
    format!("kvsnap {}", env!("CARGO_PKG_VERSION"))
}

fn serialize_timestamp<S: Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with any offset, or a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// which is taken as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Look up a header field under its current name or its legacy alias.
fn field<'a>(obj: &'a Map<String, Value>, name: &str, legacy: &str) -> Option<&'a Value> {
    obj.get(name).or_else(|| obj.get(legacy))
}

impl Header {
    #[must_use]
    pub fn new(
        tool_version: String,
        timestamp: DateTime<Utc>,
        sorted: bool,
        store_config: Value,
    ) -> Self {
        Self {
            tool_version,
            format_tag: FORMAT_TAG.to_string(),
            backup_kind: BACKUP_KIND.to_string(),
            timestamp,
            sorted,
            store_config,
        }
    }

    /// Encode as a single `\n`-terminated JSON line.
    pub fn encode(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parse and validate a header line.
    ///
    /// `None` means the input had no first line at all.
    pub fn decode_and_validate(line: Option<&str>) -> std::result::Result<Self, HeaderError> {
        let line = line
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(HeaderError::Missing)?;

        let value: Value = serde_json::from_str(line).map_err(|_| HeaderError::NotJson)?;
        let obj = value.as_object().ok_or(HeaderError::NotAnObject)?;

        let kind = field(obj, "backup_kind", "backup_type").ok_or(HeaderError::MissingBackupKind)?;
        if kind.as_str() != Some(BACKUP_KIND) {
            return Err(HeaderError::UnsupportedBackupKind {
                kind: kind.as_str().map_or_else(|| kind.to_string(), str::to_string),
            });
        }

        let timestamp = obj
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .ok_or(HeaderError::InvalidTimestamp)?;

        let text = |name: &str, legacy: &str| {
            field(obj, name, legacy)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Self {
            tool_version: text("tool_version", "vumi_version"),
            format_tag: text("format_tag", "format"),
            backup_kind: BACKUP_KIND.to_string(),
            timestamp,
            sorted: obj.get("sorted").and_then(Value::as_bool).unwrap_or(false),
            store_config: field(obj, "store_config", "redis_config")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        })
    }
}
