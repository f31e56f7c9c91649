//! Configuration module.
//!
//! Loads the YAML or TOML config file that names the store to back up or
//! restore into.

mod loader;
mod path;
mod schema;

pub use loader::{load_config, load_config_from_str, ConfigFormat};
pub use path::{expand_home, home_dir};
pub use schema::{StoreConfig, ToolConfig};
