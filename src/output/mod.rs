//! Progress and diagnostic output for backup and restore runs.
//!
//! The engines report through the [`Emitter`] trait and never print
//! directly. [`HumanOutput`] renders messages for a terminal,
//! [`RobotOutput`] as JSON lines, and [`CollectingEmitter`] keeps them in
//! memory for tests.

use std::fmt;

use serde::Serialize;

use crate::cli::Cli;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// Everything a run can report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Message {
    BackupStarted,
    /// A key was listed but gone by the time its type was read.
    KeyVanished { key: String },
    BackupFinished { keys: usize },
    HeaderRejected { reason: String },
    RestoreAborted,
    /// The snapshot claims to be from the future; TTLs are left as stored.
    ClockSkew { seconds: i64 },
    RestoreStarted { ttl_offset: i64 },
    Purged { keys: usize },
    RecordDecodeFailed { line: usize, error: String },
    BadRecord { line: usize },
    RecordRejected { line: usize, reason: String },
    RestoreFinished { restored: usize },
    SkippedLines { skipped: usize },
    ExpiredKeys { expired: usize },
}

impl Message {
    /// Whether this message reports a problem rather than progress.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::KeyVanished { .. }
                | Self::HeaderRejected { .. }
                | Self::RestoreAborted
                | Self::ClockSkew { .. }
                | Self::RecordDecodeFailed { .. }
                | Self::BadRecord { .. }
                | Self::RecordRejected { .. }
                | Self::SkippedLines { .. }
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackupStarted => write!(f, "Backing up keys ..."),
            Self::KeyVanished { key } => {
                write!(f, "Key '{key}' disappeared during backup, skipped.")
            }
            Self::BackupFinished { keys } => write!(f, "Backed up {keys} keys."),
            Self::HeaderRejected { reason } => write!(f, "{reason}"),
            Self::RestoreAborted => write!(f, "Aborting restore."),
            Self::ClockSkew { seconds } => write!(
                f,
                "Snapshot timestamp is {seconds}s in the future; TTLs are restored unadjusted."
            ),
            Self::RestoreStarted { .. } => write!(f, "Restoring keys ..."),
            Self::Purged { keys } => write!(f, "Purged {keys} existing keys."),
            Self::RecordDecodeFailed { line, error } => {
                write!(f, "Line {line} is not valid JSON: {error}")
            }
            Self::BadRecord { line } => write!(f, "Skipping bad backup record on line {line}."),
            Self::RecordRejected { line, reason } => {
                write!(f, "Skipping bad backup record on line {line}: {reason}")
            }
            Self::RestoreFinished { restored } => {
                write!(f, "{restored} keys successfully restored.")
            }
            Self::SkippedLines { skipped } => {
                write!(f, "WARNING: {skipped} bad backup lines skipped.")
            }
            Self::ExpiredKeys { expired } => write!(f, "{expired} expired keys not restored."),
        }
    }
}

/// Line-based sink for run diagnostics.
pub trait Emitter {
    /// Report one message.
    fn emit(&mut self, message: &Message);

    /// Report that `done` of `total` keys have been processed.
    fn progress(&mut self, _done: usize, _total: usize) {}
}

/// Emitter that keeps every message, for tests and embedding.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    pub messages: Vec<Message>,
}

impl CollectingEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages rendered as text lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.messages.iter().map(ToString::to_string).collect()
    }

    /// Whether any message renders to exactly `text`.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.messages.iter().any(|m| m.to_string() == text)
    }
}

impl Emitter for CollectingEmitter {
    fn emit(&mut self, message: &Message) {
        self.messages.push(message.clone());
    }
}

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotFormat {
    /// Pretty-printed final report (default for --robot).
    Json,
    /// Single-line final report (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// JSON output for AI agents and scripting.
    Robot(RobotFormat),
    /// Styled terminal output for human users.
    Human { quiet: bool, color: bool },
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            Self::Human {
                quiet: cli.quiet,
                color: !cli.no_color,
            }
        }
    }

    /// Build the emitter for this mode.
    #[must_use]
    pub fn emitter(self) -> Box<dyn Emitter> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { quiet, color } => Box::new(HumanOutput::new(quiet, color)),
        }
    }
}
