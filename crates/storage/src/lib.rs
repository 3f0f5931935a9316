//! Versioned document index
//!
//! This crate implements the in-memory primary index of a document
//! collection:
//! - VersionedIndex: open-addressing hash table of revision handles
//! - MVCC visibility rules shared by lookups, inserts and scans
//! - Growth, rollback of aborted writes, and vacuum of retired revisions
//!
//! All synchronization is internal; the index is `Send + Sync` and is
//! usually shared behind an `Arc`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod index;
mod table;
pub mod visibility;

pub use config::{ConfigError, IndexConfig, DEFAULT_INITIAL_CAPACITY};
pub use index::{IndexInitError, IndexStats, MutationPath, RollbackSummary, VersionedIndex};
