//! Backup: dump every key of a store into a snapshot stream.

use std::io::{LineWriter, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SnapError};
use crate::output::{Emitter, Message};
use crate::snapshot::{tool_version, Header, KeyType, Record};
use crate::store::StoreOperations;

/// Type tag the store reports for a missing key.
const MISSING_TYPE: &str = "none";

/// Settings for one backup run.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Write keys in lexicographic order for reproducible output.
    pub sorted: bool,
    /// Store section of the config, echoed into the header.
    pub store_config: Value,
    /// Header timestamp; the current time when `None`.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            sorted: true,
            store_config: Value::Object(serde_json::Map::new()),
            timestamp: None,
        }
    }
}

impl BackupOptions {
    #[must_use]
    pub fn new(store_config: Value) -> Self {
        Self {
            store_config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Outcome of a backup run.
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub header: Header,
    /// Records written.
    pub keys: usize,
    /// Keys listed by the store but gone before they could be read.
    pub vanished: usize,
}

/// Dumps a store's key space, one key at a time.
pub struct BackupEngine<'a, S: StoreOperations + ?Sized, E: Emitter + ?Sized> {
    store: &'a mut S,
    emitter: &'a mut E,
}

impl<'a, S: StoreOperations + ?Sized, E: Emitter + ?Sized> BackupEngine<'a, S, E> {
    pub fn new(store: &'a mut S, emitter: &'a mut E) -> Self {
        Self { store, emitter }
    }

    /// Write a complete snapshot to `out`.
    ///
    /// The header goes first, then one record per key. Output is line
    /// buffered so an interrupted run leaves only complete lines behind.
    ///
    /// # Errors
    ///
    /// Any store read failure, unsupported key type or write failure aborts
    /// the run; lines already written stay in `out`.
    #[instrument(skip_all, fields(sorted = options.sorted))]
    pub fn run<W: Write>(&mut self, out: W, options: &BackupOptions) -> Result<BackupReport> {
        self.emitter.emit(&Message::BackupStarted);

        let mut keys = self.store.keys()?;
        if options.sorted {
            keys.sort_unstable();
        }
        info!(count = keys.len(), "Enumerated keys");

        let header = Header::new(
            tool_version(),
            options.timestamp.unwrap_or_else(Utc::now),
            options.sorted,
            options.store_config.clone(),
        );

        let mut out = LineWriter::new(out);
        out.write_all(header.encode()?.as_bytes())?;

        let total = keys.len();
        let mut written = 0;
        let mut vanished = 0;
        for (i, key) in keys.iter().enumerate() {
            match self.dump_key(key)? {
                Some(record) => {
                    out.write_all(record.encode()?.as_bytes())?;
                    written += 1;
                }
                None => {
                    vanished += 1;
                    self.emitter.emit(&Message::KeyVanished { key: key.clone() });
                }
            }
            self.emitter.progress(i + 1, total);
        }
        out.flush()?;

        info!(written, vanished, "Backup complete");
        self.emitter.emit(&Message::BackupFinished { keys: written });
        Ok(BackupReport {
            header,
            keys: written,
            vanished,
        })
    }

    /// Read one key into a record; `None` if the key no longer exists.
    fn dump_key(&mut self, key: &str) -> Result<Option<Record>> {
        let type_tag = self.store.key_type(key)?;
        if type_tag == MISSING_TYPE {
            warn!(key, "Key disappeared before it could be read");
            return Ok(None);
        }
        let key_type: KeyType = type_tag.parse().map_err(|_| SnapError::UnsupportedType {
            key: Some(key.to_string()),
            type_tag,
        })?;
        let value = key_type.fetch(&mut *self.store, key)?;
        let ttl = self.store.ttl(key)?;
        debug!(key, key_type = %key_type, ?ttl, "Dumped key");
        Ok(Some(Record::new(key, value, ttl)))
    }
}
