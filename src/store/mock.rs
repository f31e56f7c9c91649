//! In-memory store for unit testing.
//!
//! Holds typed values keyed by name, records every call for later
//! assertions, and can be told to fail on particular keys or after a
//! number of calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use kvsnap::store::mock::{MockStore, Operation};
//! use kvsnap::store::StoreOperations;
//!
//! let mut store = MockStore::new().with_string("greeting", "hi").with_ttl("greeting", 30);
//!
//! assert_eq!(store.ttl("greeting").unwrap(), Some(30));
//! store.assert_operations(&[Operation::Ttl { key: "greeting".into() }]);
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use super::StoreOperations;
use crate::error::{Result, SnapError};
use crate::snapshot::KeyValue;

/// Recorded store call, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Keys,
    KeyType { key: String },
    Ttl { key: String },
    Expire { key: String, seconds: i64 },
    PurgeAll,
    Read { key: String },
    Write { key: String },
}

impl Operation {
    /// The key this call touched, if it touched just one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::KeyType { key }
            | Self::Ttl { key }
            | Self::Expire { key, .. }
            | Self::Read { key }
            | Self::Write { key } => Some(key.as_str()),
            Self::Keys | Self::PurgeAll => None,
        }
    }

    /// Whether this call changes the store.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Expire { .. } | Self::PurgeAll | Self::Write { .. }
        )
    }
}

/// Contents of one key.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Value(KeyValue),
    /// A type this tool cannot dump, known only by its tag.
    Opaque(String),
}

#[derive(Debug, Clone)]
struct Entry {
    slot: Slot,
    ttl: Option<i64>,
    /// Insertion sequence; `keys()` reports in this order.
    seq: u64,
}

/// Configuration for mock failures.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail every call after this many have been made.
    pub fail_after_ops: Option<usize>,
    /// Keys on which every call fails.
    pub failing_keys: Vec<String>,
}

/// Store double for testing without a server.
#[derive(Debug, Default)]
pub struct MockStore {
    entries: HashMap<String, Entry>,
    /// Keys listed by `keys()` that no longer exist when read.
    vanishing: Vec<String>,
    next_seq: u64,
    operation_log: Vec<Operation>,
    error_injection: Option<SnapError>,
    config: MockConfig,
}

impl MockStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        debug!("Creating mock store");
        Self::default()
    }

    // === Seeding ===

    /// Seed a key with a value, replacing anything already there.
    #[must_use]
    pub fn with_value(mut self, key: &str, value: KeyValue) -> Self {
        self.insert(key, Slot::Value(value));
        self
    }

    #[must_use]
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_value(key, KeyValue::String(value.to_string()))
    }

    #[must_use]
    pub fn with_list(self, key: &str, items: &[&str]) -> Self {
        self.with_value(key, KeyValue::List(owned(items)))
    }

    /// Seed a set; members are kept in the order given.
    #[must_use]
    pub fn with_set(self, key: &str, members: &[&str]) -> Self {
        self.with_value(key, KeyValue::Set(owned(members)))
    }

    #[must_use]
    pub fn with_zset(self, key: &str, entries: &[(&str, f64)]) -> Self {
        let mut entries: Vec<(String, f64)> =
            entries.iter().map(|(m, s)| ((*m).to_string(), *s)).collect();
        sort_zset(&mut entries);
        self.with_value(key, KeyValue::SortedSet(entries))
    }

    #[must_use]
    pub fn with_hash(self, key: &str, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(f, v)| ((*f).to_string(), (*v).to_string()))
            .collect();
        self.with_value(key, KeyValue::Hash(fields))
    }

    /// Seed a key whose type only the store understands (e.g. `stream`).
    #[must_use]
    pub fn with_raw_type(mut self, key: &str, type_tag: &str) -> Self {
        self.insert(key, Slot::Opaque(type_tag.to_string()));
        self
    }

    /// Give an existing key a time-to-live.
    #[must_use]
    pub fn with_ttl(mut self, key: &str, seconds: i64) -> Self {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.ttl = Some(seconds);
        }
        self
    }

    /// List a key that is gone by the time it is read.
    #[must_use]
    pub fn with_vanishing_key(mut self, key: &str) -> Self {
        self.vanishing.push(key.to_string());
        self
    }

    #[must_use]
    pub fn with_failing_keys(mut self, keys: &[&str]) -> Self {
        self.config.failing_keys = owned(keys);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject an error for the next call.
    pub fn inject_error(&mut self, error: SnapError) {
        self.error_injection = Some(error);
    }

    // === Inspection ===

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value held by `key`, if it has one of the dumpable types.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&KeyValue> {
        match &self.entries.get(key)?.slot {
            Slot::Value(value) => Some(value),
            Slot::Opaque(_) => None,
        }
    }

    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.value(key)? {
            KeyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.value(key)? {
            KeyValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Time-to-live of `key`, read without recording a call.
    #[must_use]
    pub fn ttl_of(&self, key: &str) -> Option<i64> {
        self.entries.get(key)?.ttl
    }

    /// Snapshot of all keys and values, for comparing two stores.
    #[must_use]
    pub fn dump(&self) -> BTreeMap<String, (Option<KeyValue>, Option<i64>)> {
        self.entries
            .iter()
            .map(|(key, entry)| {
                let value = match &entry.slot {
                    Slot::Value(v) => Some(v.clone()),
                    Slot::Opaque(_) => None,
                };
                (key.clone(), (value, entry.ttl))
            })
            .collect()
    }

    // === Assertions ===

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operation_log
    }

    /// Recorded calls that changed the store, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<Operation> {
        self.operation_log
            .iter()
            .filter(|op| op.is_mutation())
            .cloned()
            .collect()
    }

    /// # Panics
    ///
    /// Panics if the recorded calls differ from `expected`.
    pub fn assert_operations(&self, expected: &[Operation]) {
        let actual = self.operations();
        assert_eq!(
            actual, expected,
            "Operation mismatch.\nExpected: {expected:#?}\nActual: {actual:#?}",
        );
    }

    /// # Panics
    ///
    /// Panics if any call changed the store.
    pub fn assert_no_mutations(&self) {
        let mutations = self.mutations();
        assert!(
            mutations.is_empty(),
            "Expected no writes, but found: {mutations:#?}",
        );
    }

    // === Internal Helpers ===

    fn insert(&mut self, key: &str, slot: Slot) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(key.to_string(), Entry { slot, ttl: None, seq });
    }

    fn record_op(&mut self, op: Operation) {
        trace!(?op, "Recording operation");
        self.operation_log.push(op);
    }

    fn check_error(&mut self, key: Option<&str>) -> Result<()> {
        if let Some(error) = self.error_injection.take() {
            return Err(error);
        }
        if let Some(limit) = self.config.fail_after_ops {
            if self.operation_log.len() >= limit {
                return Err(SnapError::Store("Mock failure after ops limit".to_string()));
            }
        }
        if let Some(key) = key {
            if self.config.failing_keys.iter().any(|k| k == key) {
                return Err(SnapError::Store(format!("Mock key '{key}' configured to fail")));
            }
        }
        Ok(())
    }

    /// Read the value at `key`, checking its type.
    fn read(&mut self, key: &str, expected: &str) -> Result<Option<&KeyValue>> {
        self.check_error(Some(key))?;
        self.record_op(Operation::Read { key: key.to_string() });
        match self.entries.get(key).map(|e| &e.slot) {
            None => Ok(None),
            Some(Slot::Value(value)) if value.key_type().tag() == expected => Ok(Some(value)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    /// Get the value at `key` for writing, creating it with `empty` if missing.
    fn write(&mut self, key: &str, empty: KeyValue) -> Result<&mut KeyValue> {
        self.check_error(Some(key))?;
        self.record_op(Operation::Write { key: key.to_string() });
        if !self.entries.contains_key(key) {
            self.insert(key, Slot::Value(empty.clone()));
        }
        match self.entries.get_mut(key).map(|e| &mut e.slot) {
            Some(Slot::Value(value)) if value.key_type() == empty.key_type() => Ok(value),
            _ => Err(wrong_type(key)),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn sort_zset(entries: &mut [(String, f64)]) {
    entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
}

fn wrong_type(key: &str) -> SnapError {
    SnapError::Store(format!(
        "WRONGTYPE Operation against key '{key}' holding the wrong kind of value"
    ))
}

impl StoreOperations for MockStore {
    fn keys(&mut self) -> Result<Vec<String>> {
        self.check_error(None)?;
        self.record_op(Operation::Keys);
        let mut entries: Vec<(&String, u64)> =
            self.entries.iter().map(|(k, e)| (k, e.seq)).collect();
        entries.sort_by_key(|(_, seq)| *seq);
        let mut keys: Vec<String> = entries.into_iter().map(|(k, _)| k.clone()).collect();
        keys.extend(self.vanishing.iter().cloned());
        Ok(keys)
    }

    fn key_type(&mut self, key: &str) -> Result<String> {
        self.check_error(Some(key))?;
        self.record_op(Operation::KeyType { key: key.to_string() });
        Ok(match self.entries.get(key).map(|e| &e.slot) {
            None => "none".to_string(),
            Some(Slot::Value(value)) => value.key_type().tag().to_string(),
            Some(Slot::Opaque(tag)) => tag.clone(),
        })
    }

    fn ttl(&mut self, key: &str) -> Result<Option<i64>> {
        self.check_error(Some(key))?;
        self.record_op(Operation::Ttl { key: key.to_string() });
        Ok(self.ttl_of(key))
    }

    fn expire(&mut self, key: &str, seconds: i64) -> Result<()> {
        self.check_error(Some(key))?;
        self.record_op(Operation::Expire {
            key: key.to_string(),
            seconds,
        });
        if let Some(entry) = self.entries.get_mut(key) {
            entry.ttl = Some(seconds);
        }
        Ok(())
    }

    fn purge_all(&mut self) -> Result<usize> {
        self.check_error(None)?;
        self.record_op(Operation::PurgeAll);
        let count = self.entries.len();
        self.entries.clear();
        Ok(count)
    }

    fn get_string(&mut self, key: &str) -> Result<String> {
        Ok(match self.read(key, "string")? {
            Some(KeyValue::String(s)) => s.clone(),
            _ => String::new(),
        })
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.check_error(Some(key))?;
        self.record_op(Operation::Write { key: key.to_string() });
        self.insert(key, Slot::Value(KeyValue::String(value.to_string())));
        Ok(())
    }

    fn list_range(&mut self, key: &str) -> Result<Vec<String>> {
        Ok(match self.read(key, "list")? {
            Some(KeyValue::List(items)) => items.clone(),
            _ => Vec::new(),
        })
    }

    fn list_push(&mut self, key: &str, items: &[String]) -> Result<()> {
        if let KeyValue::List(list) = self.write(key, KeyValue::List(Vec::new()))? {
            list.extend_from_slice(items);
        }
        Ok(())
    }

    fn set_members(&mut self, key: &str) -> Result<Vec<String>> {
        Ok(match self.read(key, "set")? {
            Some(KeyValue::Set(members)) => members.clone(),
            _ => Vec::new(),
        })
    }

    fn set_add(&mut self, key: &str, members: &[String]) -> Result<()> {
        if let KeyValue::Set(set) = self.write(key, KeyValue::Set(Vec::new()))? {
            for member in members {
                if !set.contains(member) {
                    set.push(member.clone());
                }
            }
        }
        Ok(())
    }

    fn zset_range(&mut self, key: &str) -> Result<Vec<(String, f64)>> {
        Ok(match self.read(key, "zset")? {
            Some(KeyValue::SortedSet(entries)) => entries.clone(),
            _ => Vec::new(),
        })
    }

    fn zset_add(&mut self, key: &str, entries: &[(String, f64)]) -> Result<()> {
        if let KeyValue::SortedSet(zset) = self.write(key, KeyValue::SortedSet(Vec::new()))? {
            for (member, score) in entries {
                match zset.iter_mut().find(|(m, _)| m == member) {
                    Some(existing) => existing.1 = *score,
                    None => zset.push((member.clone(), *score)),
                }
            }
            sort_zset(zset);
        }
        Ok(())
    }

    fn hash_get_all(&mut self, key: &str) -> Result<BTreeMap<String, String>> {
        Ok(match self.read(key, "hash")? {
            Some(KeyValue::Hash(fields)) => fields.clone(),
            _ => BTreeMap::new(),
        })
    }

    fn hash_set(&mut self, key: &str, fields: &BTreeMap<String, String>) -> Result<()> {
        if let KeyValue::Hash(hash) = self.write(key, KeyValue::Hash(BTreeMap::new()))? {
            hash.extend(fields.iter().map(|(f, v)| (f.clone(), v.clone())));
        }
        Ok(())
    }
}
