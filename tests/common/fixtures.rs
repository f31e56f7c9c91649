//! Test fixture helpers for creating temporary test data.
//!
//! Files live in a temporary directory that is removed when the workspace
//! is dropped.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use kvsnap::snapshot::Header;
use tempfile::TempDir;

/// Config pointing at a port nothing listens on, so any attempt to connect
/// fails quickly.
pub const UNREACHABLE_STORE_YAML: &str = "\
redis_manager:
  host: 127.0.0.1
  port: 1
  key_prefix: kvsnap-test
";

/// Fixed timestamp used for snapshot headers in tests.
#[must_use]
pub fn snapshot_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap()
}

/// A valid header line (with terminator) taken at [`snapshot_time`].
#[must_use]
pub fn header_line() -> String {
    Header::new(
        "kvsnap test".to_string(),
        snapshot_time(),
        true,
        serde_json::json!({"key_prefix": "kvsnap-test"}),
    )
    .encode()
    .expect("header encodes")
}

/// Temporary directory holding config and snapshot files.
///
/// # Example
///
/// ```ignore
/// let ws = TestWorkspace::new();
/// let config = ws.write("config.yaml", UNREACHABLE_STORE_YAML);
/// ```
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the workspace, as a string for CLI arguments.
    #[must_use]
    pub fn arg(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    /// Write `content` to `name` and return its path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap_or_else(|e| panic!("Failed to write {path:?}: {e}"));
        path
    }

    /// Write a snapshot made of a valid header followed by `records`.
    pub fn write_snapshot(&self, name: &str, records: &[&str]) -> PathBuf {
        let mut content = header_line();
        for record in records {
            content.push_str(record);
            content.push('\n');
        }
        self.write(name, &content)
    }
}
