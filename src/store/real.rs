//! Real store implementation.
//!
//! This module wraps the `redis` crate's synchronous connection to provide
//! the concrete store. Every key is namespaced under the configured
//! `key_prefix`, so snapshots hold prefix-relative keys and can be restored
//! under a different prefix.

use std::collections::{BTreeMap, HashSet};

use redis::Commands;
use tracing::{debug, info, instrument, trace};

use super::StoreOperations;
use crate::config::StoreConfig;
use crate::error::Result;

/// Keys deleted per `DEL` call during a purge.
const PURGE_BATCH: usize = 500;

/// Connected Redis-compatible store.
pub struct RedisStore {
    conn: redis::Connection,
    prefix: String,
}

impl RedisStore {
    /// Connect to the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the server cannot be
    /// reached.
    #[instrument(skip_all, fields(endpoint = %config))]
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        let client = match &config.url {
            Some(url) => redis::Client::open(url.as_str())?,
            None => redis::Client::open(redis::ConnectionInfo {
                addr: redis::ConnectionAddr::Tcp(config.host.clone(), config.port),
                redis: redis::RedisConnectionInfo {
                    db: config.db,
                    username: config.username.clone(),
                    password: config.password.clone(),
                    ..Default::default()
                },
            })?,
        };
        let conn = client.get_connection()?;
        let prefix = config.physical_prefix();
        info!(prefix = %prefix, "Connected to store");
        Ok(Self { conn, prefix })
    }

    fn physical(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Every physical key under the prefix, deduplicated in SCAN order.
    fn scan_physical(&mut self) -> Result<Vec<String>> {
        let pattern = format!("{}*", glob_escape(&self.prefix));
        trace!(pattern = %pattern, "Scanning key space");
        let mut seen = HashSet::new();
        let keys: Vec<String> = self
            .conn
            .scan_match::<_, String>(pattern)?
            .filter(|k| seen.insert(k.clone()))
            .collect();
        debug!(count = keys.len(), "Scan complete");
        Ok(keys)
    }
}

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn glob_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl StoreOperations for RedisStore {
    fn keys(&mut self) -> Result<Vec<String>> {
        let prefix = self.prefix.clone();
        Ok(self
            .scan_physical()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    fn key_type(&mut self, key: &str) -> Result<String> {
        let key = self.physical(key);
        Ok(redis::cmd("TYPE").arg(&key).query(&mut self.conn)?)
    }

    fn ttl(&mut self, key: &str) -> Result<Option<i64>> {
        let key = self.physical(key);
        let ttl: i64 = self.conn.ttl(&key)?;
        // -1: no expiry, -2: key is gone
        Ok((ttl >= 0).then_some(ttl))
    }

    fn expire(&mut self, key: &str, seconds: i64) -> Result<()> {
        let key = self.physical(key);
        let _: () = self.conn.expire(&key, seconds)?;
        Ok(())
    }

    #[instrument(skip(self), fields(prefix = %self.prefix))]
    fn purge_all(&mut self) -> Result<usize> {
        let keys = self.scan_physical()?;
        let mut removed = 0;
        for chunk in keys.chunks(PURGE_BATCH) {
            let n: usize = redis::cmd("DEL").arg(chunk).query(&mut self.conn)?;
            removed += n;
        }
        info!(removed, "Purged key space");
        Ok(removed)
    }

    fn get_string(&mut self, key: &str) -> Result<String> {
        let key = self.physical(key);
        Ok(self.conn.get(&key)?)
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        let key = self.physical(key);
        let _: () = self.conn.set(&key, value)?;
        Ok(())
    }

    fn list_range(&mut self, key: &str) -> Result<Vec<String>> {
        let key = self.physical(key);
        Ok(self.conn.lrange(&key, 0, -1)?)
    }

    fn list_push(&mut self, key: &str, items: &[String]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let key = self.physical(key);
        let _: () = self.conn.rpush(&key, items)?;
        Ok(())
    }

    fn set_members(&mut self, key: &str) -> Result<Vec<String>> {
        let key = self.physical(key);
        Ok(self.conn.smembers(&key)?)
    }

    fn set_add(&mut self, key: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let key = self.physical(key);
        let _: () = self.conn.sadd(&key, members)?;
        Ok(())
    }

    fn zset_range(&mut self, key: &str) -> Result<Vec<(String, f64)>> {
        let key = self.physical(key);
        Ok(self.conn.zrange_withscores(&key, 0, -1)?)
    }

    fn zset_add(&mut self, key: &str, entries: &[(String, f64)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let key = self.physical(key);
        let items: Vec<(f64, &str)> = entries.iter().map(|(m, s)| (*s, m.as_str())).collect();
        let _: () = self.conn.zadd_multiple(&key, &items)?;
        Ok(())
    }

    fn hash_get_all(&mut self, key: &str) -> Result<BTreeMap<String, String>> {
        let key = self.physical(key);
        Ok(self.conn.hgetall(&key)?)
    }

    fn hash_set(&mut self, key: &str, fields: &BTreeMap<String, String>) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let key = self.physical(key);
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(f, v)| (f.as_str(), v.as_str()))
            .collect();
        let _: () = self.conn.hset_multiple(&key, &items)?;
        Ok(())
    }
}
