//! kvsnap library - snapshot and restore the key space of a Redis-compatible store.
//!
//! This library exposes the core functionality of the `kvsnap` CLI for use in
//! tests and other tools.
//!
//! # Modules
//!
//! - `snapshot`: Snapshot file format (header, records, typed values)
//! - `engine`: Backup and restore runs
//! - `store`: Store abstraction with a Redis client and an in-memory mock
//! - `config`: Configuration file handling
//! - `output`: Output mode abstraction (robot/human)
//! - `error`: Error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod snapshot;
pub mod store;
