//! # docindex
//!
//! In-memory document collections with multi-version concurrency control.
//!
//! Each collection keeps its documents in a versioned hash index. Writers
//! never overwrite a revision another transaction may still read; they
//! retire it and publish a new one. Readers see a consistent snapshot
//! without taking any lock beyond a shared index read lock.
//!
//! ## Quick Start
//!
//! ```ignore
//! use docindex::prelude::*;
//!
//! let users = DocumentCollection::new("users");
//!
//! let mut txn = users.begin();
//! users.insert(&mut txn, "alice", json!({"age": 31}))?;
//! users.commit(&mut txn)?;
//!
//! let mut reader = users.begin();
//! let alice = users.get(&mut reader, "alice")?;
//! ```
//!
//! ## Layers
//!
//! - [`docindex_core`] - revision records, ids, index errors
//! - [`docindex_concurrency`] - transaction ids, commit state, read sets
//! - [`docindex_storage`] - the versioned index itself

#![warn(missing_docs)]

mod collection;
mod config;
mod error;
mod revisions;

pub mod prelude;

// Re-export main entry points
pub use collection::{
    CollectionBuilder, CollectionStats, Document, DocumentCollection, VacuumReport,
};
pub use config::CollectionConfig;
pub use error::{Error, Result};

// Re-export layer crates
pub use docindex_concurrency::{ActiveTracking, Transaction, TransactionMetrics, TransactionStatus};
pub use docindex_core::{CollectionId, RevisionId, TxnId};
pub use docindex_storage::{IndexConfig, IndexStats, RollbackSummary};

pub use docindex_concurrency;
pub use docindex_core;
pub use docindex_storage;
