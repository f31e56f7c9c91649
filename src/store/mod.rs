//! Store abstraction layer for Redis-compatible key-value stores.
//!
//! This module provides a trait-based abstraction over a real store client
//! and an in-memory mock, so the backup and restore engines can be tested
//! without a running server.

pub mod mock;
mod real;

pub use real::RedisStore;

use std::collections::BTreeMap;

use crate::error::Result;

/// Core store operations trait.
///
/// Keys passed to and returned from these methods are relative to the
/// store's namespace; implementations that namespace keys (see
/// [`RedisStore`]) add and strip their prefix internally.
///
/// # Implementation Notes
///
/// - Every method touches only the key it is given, except
///   [`keys`](Self::keys) and [`purge_all`](Self::purge_all)
/// - Calls are issued one at a time; implementations need not be re-entrant
pub trait StoreOperations {
    /// Enumerate every key in the namespace, in whatever order the store
    /// reports them.
    fn keys(&mut self) -> Result<Vec<String>>;

    /// Raw type tag of a key as reported by the store (`string`, `list`,
    /// `set`, `zset`, `hash`, `none`, or anything else the store supports).
    fn key_type(&mut self, key: &str) -> Result<String>;

    /// Remaining time-to-live in seconds, or `None` if the key never expires.
    fn ttl(&mut self, key: &str) -> Result<Option<i64>>;

    /// Set a key's time-to-live in seconds.
    fn expire(&mut self, key: &str, seconds: i64) -> Result<()>;

    /// Delete every key in the namespace. Returns the number removed.
    fn purge_all(&mut self) -> Result<usize>;

    /// Read a string value.
    fn get_string(&mut self, key: &str) -> Result<String>;

    /// Overwrite a string value.
    fn set_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Read a whole list, head to tail.
    fn list_range(&mut self, key: &str) -> Result<Vec<String>>;

    /// Append items to the tail of a list, in order.
    fn list_push(&mut self, key: &str, items: &[String]) -> Result<()>;

    /// Read all members of a set, in store order.
    fn set_members(&mut self, key: &str) -> Result<Vec<String>>;

    /// Add members to a set.
    fn set_add(&mut self, key: &str, members: &[String]) -> Result<()>;

    /// Read a whole sorted set as `(member, score)` pairs, lowest score first.
    fn zset_range(&mut self, key: &str) -> Result<Vec<(String, f64)>>;

    /// Add `(member, score)` pairs to a sorted set.
    fn zset_add(&mut self, key: &str, entries: &[(String, f64)]) -> Result<()>;

    /// Read every field of a hash.
    fn hash_get_all(&mut self, key: &str) -> Result<BTreeMap<String, String>>;

    /// Assign several hash fields at once.
    fn hash_set(&mut self, key: &str, fields: &BTreeMap<String, String>) -> Result<()>;
}
