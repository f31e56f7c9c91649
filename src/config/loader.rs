//! Configuration file loading.
//!
//! Config files may be YAML or TOML; the format is picked from the file
//! extension.

use std::path::Path;

use tracing::{debug, info, instrument, trace};

use crate::error::{Result, SnapError};

use super::ToolConfig;

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting config format from extension");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Load the tool configuration from a file.
///
/// # Errors
///
/// Returns an error if:
/// - The format cannot be detected from the extension
/// - The file cannot be read
/// - The file content cannot be parsed
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ToolConfig> {
    let path = path.as_ref();
    info!("Loading configuration file");

    let format = ConfigFormat::from_extension(path).ok_or_else(|| {
        SnapError::ConfigParse(format!(
            "Unknown config format for '{}': expected .yaml, .yml, or .toml",
            path.display()
        ))
    })?;
    debug!(format = ?format, "Detected config format");

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SnapError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            SnapError::Io(e)
        }
    })?;
    debug!(bytes = content.len(), "Read config file");

    load_config_from_str(&content, format)
}

/// Load the tool configuration from a string with a specified format.
///
/// An empty document is an empty configuration.
///
/// # Errors
///
/// Returns an error if parsing fails.
#[instrument(skip(content), fields(format = ?format, content_len = content.len()))]
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<ToolConfig> {
    if content.trim().is_empty() {
        debug!("Config file is empty, using defaults");
        return Ok(ToolConfig::default());
    }

    let config: ToolConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| SnapError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| SnapError::ConfigParse(format!("TOML: {e}")))?
        }
    };

    info!(
        has_store_section = config.redis_manager.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}
