//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::engine::RestoreOptions;

/// kvsnap - Snapshot and restore the key space of a Redis-compatible store.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "kvsnap", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "KVSNAP_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose logging (repeat for more detail)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only warnings and errors)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up every key in the configured store to a snapshot file
    Backup(BackupArgs),

    /// Restore keys from a snapshot file into the configured store
    Restore(RestoreArgs),

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct BackupArgs {
    /// Configuration file (YAML or TOML) with a `redis_manager` section
    pub config: PathBuf,

    /// Snapshot file to write (replaced if it exists)
    pub output: PathBuf,

    /// Write keys in the order the store lists them instead of sorted
    #[arg(long)]
    pub not_sorted: bool,
}

#[derive(Parser, Debug)]
pub struct RestoreArgs {
    /// Configuration file (YAML or TOML) with a `redis_manager` section
    pub config: PathBuf,

    /// Snapshot file to read
    pub input: PathBuf,

    /// Delete every key in the target store before restoring
    #[arg(long)]
    pub purge: bool,

    /// Restore TTLs exactly as recorded, without subtracting time elapsed
    /// since the snapshot was taken
    #[arg(long)]
    pub frozen_ttls: bool,
}

impl RestoreArgs {
    #[must_use]
    pub const fn options(&self) -> RestoreOptions {
        RestoreOptions {
            purge: self.purge,
            frozen_ttls: self.frozen_ttls,
        }
    }
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
