//! Integration tests for backup and restore runs.

use std::io::{BufReader, Cursor, Read};

use chrono::{DateTime, Duration, TimeZone, Utc};
use kvsnap::engine::{
    read_header, BackupEngine, BackupOptions, RestoreEngine, RestoreOptions, RestoreReport,
};
use kvsnap::error::SnapError;
use kvsnap::output::{CollectingEmitter, Message};
use kvsnap::snapshot::{decode, KeyValue};
use kvsnap::store::mock::{MockStore, Operation};

fn taken_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap()
}

/// A store holding one key of every supported type.
fn populated_store() -> MockStore {
    MockStore::new()
        .with_string("greeting", "hello")
        .with_string("session", "token")
        .with_ttl("session", 100)
        .with_list("queue", &["job-3", "job-1", "job-2"])
        .with_set("tags", &["blue", "green", "red"])
        .with_zset("scores", &[("ann", 2.5), ("bob", -1.0), ("top", f64::INFINITY)])
        .with_hash("user:1", &[("name", "Ann"), ("email", "ann@example.com")])
}

fn backup(store: &mut MockStore, options: &BackupOptions) -> Vec<u8> {
    let mut emitter = CollectingEmitter::new();
    let mut out = Vec::new();
    BackupEngine::new(store, &mut emitter)
        .run(&mut out, options)
        .expect("backup succeeds");
    out
}

fn restore_at(
    store: &mut MockStore,
    snapshot: &[u8],
    options: RestoreOptions,
    now: DateTime<Utc>,
) -> (Result<RestoreReport, SnapError>, CollectingEmitter) {
    let mut emitter = CollectingEmitter::new();
    let report = RestoreEngine::new(store, &mut emitter).run_at(Cursor::new(snapshot), options, now);
    (report, emitter)
}

fn snapshot_with(records: &[&str]) -> Vec<u8> {
    let mut store = MockStore::new();
    let mut bytes = backup(&mut store, &BackupOptions::default().at(taken_at()));
    for record in records {
        bytes.extend_from_slice(record.as_bytes());
        bytes.push(b'\n');
    }
    bytes
}

#[test]
fn test_round_trip_reproduces_every_type() {
    let mut source = populated_store();
    let snapshot = backup(&mut source, &BackupOptions::default().at(taken_at()));

    let mut target = MockStore::new();
    let (report, _) = restore_at(&mut target, &snapshot, RestoreOptions::default(), taken_at());
    let report = report.unwrap();
    assert_eq!(report.restored, 6);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.expired, 0);

    assert_eq!(target.dump(), source.dump());
}

#[test]
fn test_round_trip_decays_ttl_by_elapsed_time() {
    let mut source = populated_store();
    let snapshot = backup(&mut source, &BackupOptions::default().at(taken_at()));

    let mut target = MockStore::new();
    let later = taken_at() + Duration::seconds(40);
    let (report, _) = restore_at(&mut target, &snapshot, RestoreOptions::default(), later);
    assert_eq!(report.unwrap().ttl_offset, 40);
    assert_eq!(target.ttl_of("session"), Some(60));
    assert_eq!(target.ttl_of("greeting"), None);
}

#[test]
fn test_frozen_ttls_restore_recorded_values() {
    let mut source = populated_store();
    let snapshot = backup(&mut source, &BackupOptions::default().at(taken_at()));

    let mut target = MockStore::new();
    let later = taken_at() + Duration::seconds(40);
    let options = RestoreOptions {
        frozen_ttls: true,
        ..RestoreOptions::default()
    };
    restore_at(&mut target, &snapshot, options, later).0.unwrap();
    assert_eq!(target.ttl_of("session"), Some(100));
}

#[test]
fn test_key_expired_since_snapshot_is_not_restored() {
    let snapshot = snapshot_with(&[
        r#"{"type":"string","key":"brief","value":"x","ttl":10}"#,
        r#"{"type":"string","key":"lasting","value":"y","ttl":600}"#,
    ]);
    let mut target = MockStore::new();
    let later = taken_at() + Duration::seconds(50);
    let (report, emitter) = restore_at(&mut target, &snapshot, RestoreOptions::default(), later);
    let report = report.unwrap();

    assert_eq!((report.restored, report.skipped, report.expired), (1, 0, 1));
    assert!(!target.contains("brief"));
    assert_eq!(target.ttl_of("lasting"), Some(550));
    assert!(emitter.contains("1 expired keys not restored."));
    assert!(!emitter.lines().iter().any(|l| l.starts_with("WARNING")));
}

#[test]
fn test_sorted_backups_are_byte_identical() {
    let mut first = MockStore::new()
        .with_string("a", "1")
        .with_set("s", &["x", "y", "z"])
        .with_hash("h", &[("k1", "v1"), ("k2", "v2")]);
    let mut second = MockStore::new()
        .with_hash("h", &[("k2", "v2"), ("k1", "v1")])
        .with_set("s", &["z", "x", "y"])
        .with_string("a", "1");

    let options = BackupOptions::default().at(taken_at());
    assert_eq!(backup(&mut first, &options), backup(&mut second, &options));
}

#[test]
fn test_every_line_is_standalone_json() {
    let mut source = populated_store();
    let snapshot = backup(&mut source, &BackupOptions::default().at(taken_at()));
    let text = String::from_utf8(snapshot).unwrap();

    assert!(text.ends_with('\n'));
    for line in text.lines() {
        let value = decode(line).unwrap_or_else(|e| panic!("line {line:?}: {e}"));
        assert!(value.is_object());
    }
    let zset_line = text.lines().find(|l| l.contains("\"scores\"")).unwrap();
    assert!(zset_line.contains(r#"["top","inf"]"#), "{zset_line}");
}

#[test]
fn test_malformed_lines_are_skipped_and_counted() {
    let snapshot = snapshot_with(&[
        r#"{"type":"string","key":"one","value":"1","ttl":null}"#,
        r#"{"type":"string","key":"#,
        r#"{"type":"list","key":"two","value":["a"],"ttl":null}"#,
        r#"{"key":"three","value":"3","ttl":null}"#,
    ]);
    let mut target = MockStore::new();
    let (report, emitter) = restore_at(&mut target, &snapshot, RestoreOptions::default(), taken_at());
    let report = report.unwrap();

    assert_eq!(report.restored, 2);
    assert_eq!(report.skipped, 2);
    assert!(target.contains("one"));
    assert!(target.contains("two"));
    assert!(emitter.contains("Skipping bad backup record on line 4."));
    assert!(emitter.contains("2 keys successfully restored."));
    assert!(emitter.contains("WARNING: 2 bad backup lines skipped."));
}

#[test]
fn test_rejected_header_leaves_store_untouched() {
    let mut target = MockStore::new().with_string("keep", "me");
    let options = RestoreOptions {
        purge: true,
        frozen_ttls: false,
    };
    let (report, emitter) = restore_at(&mut target, b"not a header\n", options, taken_at());

    assert!(matches!(report, Err(SnapError::FatalConfig(_))));
    target.assert_no_mutations();
    assert_eq!(emitter.lines(), ["Header not JSON.", "Aborting restore."]);
}

#[test]
fn test_wrong_backup_kind_is_rejected() {
    let snapshot = br#"{"backup_type": "riak", "timestamp": "2024-03-15T08:30:00"}
{"type":"string","key":"k","value":"v","ttl":null}
"#;
    let mut target = MockStore::new();
    let (report, emitter) = restore_at(&mut target, snapshot, RestoreOptions::default(), taken_at());
    assert!(report.is_err());
    assert!(target.is_empty());
    assert!(emitter.contains("Only redis backup type currently supported."));
}

#[test]
fn test_purge_happens_once_before_records() {
    let snapshot = snapshot_with(&[
        r#"{"type":"string","key":"fresh","value":"v","ttl":null}"#,
        r#"{"type":"string","key":"other","value":"w","ttl":null}"#,
    ]);
    let mut target = MockStore::new()
        .with_string("stale", "x")
        .with_list("fresh", &["old"]);
    let options = RestoreOptions {
        purge: true,
        frozen_ttls: false,
    };
    let (report, emitter) = restore_at(&mut target, &snapshot, options, taken_at());

    assert_eq!(report.unwrap().purged, Some(2));
    assert_eq!(
        target.mutations(),
        [
            Operation::PurgeAll,
            Operation::Write { key: "fresh".into() },
            Operation::Write { key: "other".into() },
        ]
    );
    assert!(!target.contains("stale"));
    assert!(emitter.messages.contains(&Message::Purged { keys: 2 }));
}

#[test]
fn test_restore_without_purge_merges_into_existing_keys() {
    let snapshot = snapshot_with(&[r#"{"type":"list","key":"q","value":["b"],"ttl":null}"#]);
    let mut target = MockStore::new().with_list("q", &["a"]);
    restore_at(&mut target, &snapshot, RestoreOptions::default(), taken_at())
        .0
        .unwrap();
    assert_eq!(target.list("q").unwrap(), ["a", "b"]);
}

#[test]
fn test_header_checked_before_store_is_used() {
    let snapshot = snapshot_with(&[r#"{"type":"string","key":"k","value":"v","ttl":null}"#]);
    let mut reader = BufReader::new(Cursor::new(snapshot));
    let mut emitter = CollectingEmitter::new();

    let (header, mut first) = read_header(&mut reader, &mut emitter).unwrap();
    assert_eq!(header.timestamp, taken_at());
    assert!(emitter.messages.is_empty());

    first.push(b'\n');
    let replay = Cursor::new(first).chain(reader);
    let mut target = MockStore::new();
    let report = RestoreEngine::new(&mut target, &mut emitter)
        .run_at(BufReader::new(replay), RestoreOptions::default(), taken_at())
        .unwrap();
    assert_eq!(report.restored, 1);
    assert_eq!(target.value("k"), Some(&KeyValue::String("v".into())));
}
