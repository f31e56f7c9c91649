//! Snapshot file format.
//!
//! A snapshot is UTF-8 text with one JSON value per `\n`-terminated line:
//!
//! ```text
//! {"tool_version":"kvsnap 0.1.0","format_tag":"LF separated JSON","backup_kind":"redis","timestamp":"2024-03-01T12:30:00.000000Z","sorted":true,"store_config":{}}
//! {"type":"string","key":"greeting","value":"hello","ttl":null}
//! {"type":"zset","key":"scores","value":[["ada",12.0],["bob",30.5]],"ttl":3600}
//! ```
//!
//! The first line is the [`Header`]; every further line is a [`Record`].
//! Because records never span lines, a file cut short mid-backup is still
//! readable up to its last complete line.

mod header;
mod record;
mod value;

pub use header::{parse_timestamp, tool_version, Header, BACKUP_KIND, FORMAT_TAG};
pub use record::{decode, is_well_formed, Record, REQUIRED_FIELDS};
pub use value::{KeyType, KeyValue};
