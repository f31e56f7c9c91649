//! Per-type value handling.
//!
//! [`KeyType`] is the closed set of key types a snapshot can carry and
//! [`KeyValue`] the value shape for each. Reading a key goes through
//! [`KeyType::fetch`], writing it back through [`KeyValue::apply`]; both
//! dispatch with a `match`, so an unknown type tag can only enter through
//! [`KeyType::from_str`], which rejects it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeSeq, SerializeTuple};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::trace;

use crate::error::{Result, SnapError};
use crate::store::StoreOperations;

/// Key type tag, as reported by the store's `TYPE` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeyType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "list")]
    List,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "zset")]
    SortedSet,
    #[serde(rename = "hash")]
    Hash,
}

impl KeyType {
    /// Every supported type.
    pub const ALL: [Self; 5] = [
        Self::String,
        Self::List,
        Self::Set,
        Self::SortedSet,
        Self::Hash,
    ];

    /// Wire tag for this type.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::List => "list",
            Self::Set => "set",
            Self::SortedSet => "zset",
            Self::Hash => "hash",
        }
    }

    /// Read the full value of `key`, which must hold this type.
    ///
    /// Set members come back sorted so repeated dumps of an unchanged set
    /// are identical.
    pub fn fetch<S: StoreOperations + ?Sized>(self, store: &mut S, key: &str) -> Result<KeyValue> {
        trace!(key, key_type = self.tag(), "Fetching value");
        Ok(match self {
            Self::String => KeyValue::String(store.get_string(key)?),
            Self::List => KeyValue::List(store.list_range(key)?),
            Self::Set => {
                let mut members = store.set_members(key)?;
                members.sort_unstable();
                members.dedup();
                KeyValue::Set(members)
            }
            Self::SortedSet => KeyValue::SortedSet(store.zset_range(key)?),
            Self::Hash => KeyValue::Hash(store.hash_get_all(key)?),
        })
    }
}

impl FromStr for KeyType {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| SnapError::UnsupportedType {
                key: None,
                type_tag: s.to_string(),
            })
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The value held by one key.
///
/// Serializes to the record's `value` field: a string, an array of strings,
/// an array of `[member, score]` pairs, or an object.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    String(String),
    /// Items head to tail.
    List(Vec<String>),
    /// Members, sorted when read from a store.
    Set(Vec<String>),
    /// `(member, score)` pairs, lowest score first.
    SortedSet(Vec<(String, f64)>),
    Hash(BTreeMap<String, String>),
}

impl KeyValue {
    /// Type of this value.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        match self {
            Self::String(_) => KeyType::String,
            Self::List(_) => KeyType::List,
            Self::Set(_) => KeyType::Set,
            Self::SortedSet(_) => KeyType::SortedSet,
            Self::Hash(_) => KeyType::Hash,
        }
    }

    /// Write this value to `key`.
    ///
    /// Lists are appended to, sets and sorted sets added to, hash fields
    /// assigned and strings overwritten; restoring into an empty key space
    /// therefore reproduces the original value exactly.
    pub fn apply<S: StoreOperations + ?Sized>(&self, store: &mut S, key: &str) -> Result<()> {
        trace!(key, key_type = self.key_type().tag(), "Applying value");
        match self {
            Self::String(v) => store.set_string(key, v),
            Self::List(items) => store.list_push(key, items),
            Self::Set(members) => store.set_add(key, members),
            Self::SortedSet(entries) => store.zset_add(key, entries),
            Self::Hash(fields) => store.hash_set(key, fields),
        }
    }

    /// Decode a record's `value` field for the given type.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::InvalidRecord`] if the JSON shape does not match
    /// `key_type`.
    pub fn from_json(key_type: KeyType, value: &Value) -> Result<Self> {
        match key_type {
            KeyType::String => value
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(|| shape_error(key_type, "a string")),
            KeyType::List => string_array(value)
                .map(Self::List)
                .ok_or_else(|| shape_error(key_type, "an array of strings")),
            KeyType::Set => string_array(value)
                .map(Self::Set)
                .ok_or_else(|| shape_error(key_type, "an array of strings")),
            KeyType::SortedSet => score_pairs(value)
                .map(Self::SortedSet)
                .ok_or_else(|| shape_error(key_type, "an array of [member, score] pairs")),
            KeyType::Hash => value
                .as_object()
                .and_then(|obj| {
                    obj.iter()
                        .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect::<Option<BTreeMap<_, _>>>()
                })
                .map(Self::Hash)
                .ok_or_else(|| shape_error(key_type, "an object of string fields")),
        }
    }
}

fn shape_error(key_type: KeyType, expected: &str) -> SnapError {
    SnapError::InvalidRecord(format!("{key_type} value must be {expected}"))
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn score_pairs(value: &Value) -> Option<Vec<(String, f64)>> {
    value
        .as_array()?
        .iter()
        .map(|pair| match pair.as_array()?.as_slice() {
            [member, score] => Some((member.as_str()?.to_string(), parse_score(score)?)),
            _ => None,
        })
        .collect()
}

/// Scores are JSON numbers, except infinities which JSON cannot express and
/// are written as the store's own `"inf"` / `"-inf"`.
fn parse_score(value: &Value) -> Option<f64> {
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    match value.as_str()? {
        "inf" | "+inf" | "Infinity" => Some(f64::INFINITY),
        "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

struct Score(f64);

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0.is_finite() {
            serializer.serialize_f64(self.0)
        } else if self.0 > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

impl Serialize for KeyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::String(v) => serializer.serialize_str(v),
            Self::List(items) | Self::Set(items) => items.serialize(serializer),
            Self::SortedSet(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for (member, score) in entries {
                    seq.serialize_element(&Pair(member, Score(*score)))?;
                }
                seq.end()
            }
            Self::Hash(fields) => fields.serialize(serializer),
        }
    }
}

struct Pair<'a>(&'a str, Score);

impl Serialize for Pair<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(self.0)?;
        tup.serialize_element(&self.1)?;
        tup.end()
    }
}
