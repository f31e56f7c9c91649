//! Robot mode JSON output implementation.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::error::SnapError;

use super::{Emitter, Message, RobotFormat};

/// JSON output implementation for AI agents and scripting.
///
/// Every [`Message`] becomes one JSON line on stdout, carrying its event
/// fields plus the rendered `message` text.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    /// Build the JSON object for one message.
    #[must_use]
    pub fn event_json(message: &Message) -> Value {
        let mut json = serde_json::to_value(message).unwrap_or(Value::Null);
        if let Value::Object(obj) = &mut json {
            obj.insert("level".into(), level(message).into());
            obj.insert("message".into(), message.to_string().into());
        }
        json
    }

    /// Output a final report, pretty or compact per the format.
    pub fn report<T: Serialize + ?Sized>(&self, data: &T) {
        let json = match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        };
        match json {
            Ok(json) => println!("{json}"),
            Err(e) => debug!(error = %e, "Failed to serialize report"),
        }
    }

    /// Output the closing report of a run that streamed events.
    ///
    /// Always a single line, so stdout stays one JSON value per line.
    pub fn finish<T: Serialize + ?Sized>(data: &T) {
        match report_line(data) {
            Ok(json) => println!("{json}"),
            Err(e) => debug!(error = %e, "Failed to serialize report"),
        }
    }

    /// Output an error object to stderr.
    pub fn error(error: &SnapError) {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!("{json}");
    }
}

fn report_line<T: Serialize + ?Sized>(data: &T) -> serde_json::Result<String> {
    serde_json::to_string(data)
}

const fn level(message: &Message) -> &'static str {
    if message.is_warning() { "warning" } else { "info" }
}

impl Emitter for RobotOutput {
    fn emit(&mut self, message: &Message) {
        let json = Self::event_json(message);
        trace!(event = %json, "Robot: event");
        println!("{json}");
    }
}
