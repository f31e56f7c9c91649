//! Backup and restore engines.
//!
//! Both engines drive a [`StoreOperations`](crate::store::StoreOperations)
//! implementation and report through an [`Emitter`](crate::output::Emitter);
//! neither opens files or connections itself.

pub mod backup;
pub mod restore;

pub use backup::{BackupEngine, BackupOptions, BackupReport};
pub use restore::{read_header, RestoreEngine, RestoreOptions, RestoreReport};
