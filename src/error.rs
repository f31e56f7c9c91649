//! Error types for snapshot and restore operations.

use thiserror::Error;

/// Reasons a snapshot header is rejected.
///
/// Any of these aborts a restore before the target store is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Header not found.")]
    Missing,

    #[error("Header not JSON.")]
    NotJson,

    #[error("Header not JSON dict.")]
    NotAnObject,

    #[error("Header missing backup_type.")]
    MissingBackupKind,

    #[error("Only redis backup type currently supported.")]
    UnsupportedBackupKind { kind: String },

    #[error("Header timestamp missing or invalid.")]
    InvalidTimestamp,
}

/// Primary error type for kvsnap operations.
#[derive(Error, Debug)]
pub enum SnapError {
    // Snapshot format errors
    #[error("Invalid snapshot header: {0}")]
    FatalConfig(#[from] HeaderError),

    #[error("Unsupported key type '{type_tag}'{}", key_suffix(.key))]
    UnsupportedType {
        key: Option<String>,
        type_tag: String,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_ref()
        .map(|k| format!(" for key '{k}'"))
        .unwrap_or_default()
}

impl SnapError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FatalConfig(_)
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::UnsupportedType { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::FatalConfig(_) => Some("Check that the input file was written by `kvsnap backup`"),
            Self::ConfigNotFound { .. } => Some("Pass the path of an existing YAML or TOML config"),
            Self::Redis(_) => Some("Check the redis_manager section of the config and that the store is reachable"),
            Self::UnsupportedType { .. } => {
                Some("Only string, list, set, zset and hash keys can be backed up")
            }
            _ => None,
        }
    }
}

/// Convenience type alias for Results using SnapError.
pub type Result<T> = std::result::Result<T, SnapError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| SnapError::Other(format!("{}: {e}", f().into())))
    }
}
