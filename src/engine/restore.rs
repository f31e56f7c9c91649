//! Restore: replay a snapshot stream into a store.
//!
//! A bad header aborts before the store is touched. After that, every
//! record line stands alone: lines that cannot be decoded or do not describe
//! a usable key are reported and skipped, and keys whose TTL ran out since
//! the snapshot was taken are dropped.

use std::io::BufRead;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{Result, SnapError};
use crate::output::{Emitter, Message};
use crate::snapshot::{decode, is_well_formed, Header, Record};
use crate::store::StoreOperations;

/// Settings for one restore run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Delete every key in the target before the first record is applied.
    pub purge: bool,
    /// Restore TTLs as stored, ignoring time elapsed since the snapshot.
    pub frozen_ttls: bool,
}

/// Outcome of a restore run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Records written to the store.
    pub restored: usize,
    /// Lines that could not be used.
    pub skipped: usize,
    /// Records dropped because their TTL ran out before the restore.
    pub expired: usize,
    /// Keys removed by the purge, if one ran.
    pub purged: Option<usize>,
    /// Seconds subtracted from every stored TTL.
    pub ttl_offset: i64,
}

/// What happened to one record line.
enum Outcome {
    Restored,
    Skipped,
    Expired,
}

/// Replays a snapshot into a store, one line at a time.
pub struct RestoreEngine<'a, S: StoreOperations + ?Sized, E: Emitter + ?Sized> {
    store: &'a mut S,
    emitter: &'a mut E,
}

impl<'a, S: StoreOperations + ?Sized, E: Emitter + ?Sized> RestoreEngine<'a, S, E> {
    pub fn new(store: &'a mut S, emitter: &'a mut E) -> Self {
        Self { store, emitter }
    }

    /// Restore from `input`, measuring TTL decay against the current time.
    pub fn run<R: BufRead>(&mut self, input: R, options: RestoreOptions) -> Result<RestoreReport> {
        self.run_at(input, options, Utc::now())
    }

    /// Restore from `input` as if it were `now`.
    ///
    /// # Errors
    ///
    /// - [`SnapError::FatalConfig`] if the header is missing or invalid; the
    ///   store is untouched
    /// - store or read errors, which abort the run part way
    #[instrument(skip_all, fields(purge = options.purge, frozen_ttls = options.frozen_ttls))]
    pub fn run_at<R: BufRead>(
        &mut self,
        mut input: R,
        options: RestoreOptions,
        now: DateTime<Utc>,
    ) -> Result<RestoreReport> {
        let (header, _) = read_header(&mut input, &mut *self.emitter)?;
        debug!(tool_version = %header.tool_version, timestamp = %header.timestamp, "Header accepted");

        let ttl_offset = self.ttl_offset(&header, options, now);
        let mut report = RestoreReport {
            ttl_offset,
            ..RestoreReport::default()
        };
        self.emitter.emit(&Message::RestoreStarted { ttl_offset });

        if options.purge {
            let purged = self.store.purge_all()?;
            report.purged = Some(purged);
            self.emitter.emit(&Message::Purged { keys: purged });
        }

        // Record lines are numbered from 1, not counting the header.
        let mut line_no = 0;
        while let Some(bytes) = read_line(&mut input)? {
            line_no += 1;
            match self.restore_line(&bytes, line_no, ttl_offset)? {
                Outcome::Restored => report.restored += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Expired => report.expired += 1,
            }
        }

        info!(
            restored = report.restored,
            skipped = report.skipped,
            expired = report.expired,
            "Restore complete"
        );
        self.emitter.emit(&Message::RestoreFinished {
            restored: report.restored,
        });
        if report.skipped != 0 {
            self.emitter.emit(&Message::SkippedLines {
                skipped: report.skipped,
            });
        }
        if report.expired != 0 {
            self.emitter.emit(&Message::ExpiredKeys {
                expired: report.expired,
            });
        }
        Ok(report)
    }

    fn ttl_offset(&mut self, header: &Header, options: RestoreOptions, now: DateTime<Utc>) -> i64 {
        if options.frozen_ttls {
            return 0;
        }
        let elapsed = (now - header.timestamp).num_seconds();
        if elapsed < 0 {
            warn!(seconds = -elapsed, "Snapshot timestamp is in the future");
            self.emitter.emit(&Message::ClockSkew { seconds: -elapsed });
            return 0;
        }
        elapsed
    }

    fn restore_line(&mut self, bytes: &[u8], line: usize, ttl_offset: i64) -> Result<Outcome> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                self.emitter.emit(&Message::RecordDecodeFailed {
                    line,
                    error: e.to_string(),
                });
                return Ok(Outcome::Skipped);
            }
        };

        let value = match decode(text) {
            Ok(value) => value,
            Err(e) => {
                debug!(line, error = %e, "Undecodable record line");
                self.emitter.emit(&Message::RecordDecodeFailed {
                    line,
                    error: e.to_string(),
                });
                return Ok(Outcome::Skipped);
            }
        };

        if !is_well_formed(&value) {
            debug!(line, "Record missing required fields");
            self.emitter.emit(&Message::BadRecord { line });
            return Ok(Outcome::Skipped);
        }

        let record = match Record::from_json(&value) {
            Ok(record) => record,
            Err(e) => {
                debug!(line, error = %e, "Unusable record");
                self.emitter.emit(&Message::RecordRejected {
                    line,
                    reason: e.to_string(),
                });
                return Ok(Outcome::Skipped);
            }
        };

        // Below i64::MIN is long expired.
        let ttl = record.ttl.map(|ttl| ttl.checked_sub(ttl_offset).unwrap_or(0));
        if let Some(ttl) = ttl {
            if ttl <= 0 {
                trace!(key = %record.key, ttl, "Key expired before restore");
                return Ok(Outcome::Expired);
            }
        }

        record.value.apply(&mut *self.store, &record.key)?;
        if let Some(ttl) = ttl {
            self.store.expire(&record.key, ttl)?;
        }
        trace!(key = %record.key, key_type = %record.key_type, ?ttl, "Restored key");
        Ok(Outcome::Restored)
    }
}

/// Read and validate the header line of a snapshot.
///
/// Returns the header with the raw line, terminator stripped, so a caller
/// that checks the header before opening the store can replay it. A
/// rejected header is reported to `emitter` before the error is returned.
///
/// # Errors
///
/// [`SnapError::FatalConfig`] if the header is missing or invalid.
pub fn read_header<R: BufRead, E: Emitter + ?Sized>(
    input: &mut R,
    emitter: &mut E,
) -> Result<(Header, Vec<u8>)> {
    let first = read_line(input)?;
    let checked = {
        let text = first.as_deref().map(String::from_utf8_lossy);
        Header::decode_and_validate(text.as_deref())
    };
    match checked {
        Ok(header) => Ok((header, first.unwrap_or_default())),
        Err(e) => {
            warn!(error = %e, "Rejected snapshot header");
            emitter.emit(&Message::HeaderRejected {
                reason: e.to_string(),
            });
            emitter.emit(&Message::RestoreAborted);
            Err(SnapError::FatalConfig(e))
        }
    }
}

/// Read one line without its terminator; `None` at end of input.
///
/// Lines are read as bytes so that invalid UTF-8 only spoils its own line.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    if input.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(buf))
}
