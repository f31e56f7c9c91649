//! Configuration data types.
//!
//! The config file is shared with other tools, so only the `redis_manager`
//! section is read here. It is kept twice: verbatim, so it can be echoed into
//! snapshot headers, and parsed into a typed [`StoreConfig`] for connecting.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SnapError};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolConfig {
    /// The raw `redis_manager` section, if present.
    #[serde(default)]
    pub redis_manager: Option<Value>,
}

impl ToolConfig {
    /// The store section as an opaque JSON object, `{}` when absent.
    #[must_use]
    pub fn store_section(&self) -> Value {
        match &self.redis_manager {
            Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
            Some(v) => v.clone(),
        }
    }

    /// Parse the store section into connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::ConfigParse`] if the section has the wrong shape.
    pub fn store_config(&self) -> Result<StoreConfig> {
        serde_json::from_value(self.store_section())
            .map_err(|e| SnapError::ConfigParse(format!("redis_manager: {e}")))
    }
}

/// Connection and namespacing settings for the store.
///
/// # Example YAML
///
/// ```yaml
/// redis_manager:
///   host: cache.internal
///   port: 6380
///   db: 2
///   key_prefix: myapp
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Full connection URL (`redis://...`). Overrides host/port/db when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Namespace prefix; keys are stored as `<prefix>:<key>`.
    pub key_prefix: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            username: None,
            password: None,
            key_prefix: None,
        }
    }
}

impl StoreConfig {
    /// The physical prefix prepended to every key, including the separator.
    #[must_use]
    pub fn physical_prefix(&self) -> String {
        match self.key_prefix.as_deref() {
            Some(p) if !p.is_empty() => format!("{p}:"),
            _ => String::new(),
        }
    }
}

/// Redacted endpoint description, safe for logs.
impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.url.is_some() {
            return write!(f, "<url>");
        }
        write!(f, "{}:{}/{}", self.host, self.port, self.db)
    }
}
