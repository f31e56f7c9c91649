//! Path helpers for command-line file arguments.
//!
//! Supports "~" home directory expansion for paths that reach the tool
//! without passing through a shell (config files, env vars, scripts).

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{Result, SnapError};

/// Expand a leading `~` to the user's home directory.
///
/// Any other path is returned unchanged.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    trace!(path = %path.display(), "Resolving path");

    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let rest = path_str.strip_prefix("~/").unwrap_or("");
        let resolved = if rest.is_empty() {
            home
        } else {
            home.join(rest)
        };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory path"
        );
        return Ok(resolved);
    }

    Ok(path.to_path_buf())
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| SnapError::Other("Could not determine home directory".to_string()))
}
