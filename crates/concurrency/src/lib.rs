//! Concurrency layer for docindex
//!
//! This crate supplies the transaction side of the index contract:
//! - TransactionManager: id allocation, commit/abort, active-set registry
//! - Transaction: per-worker handle implementing `TransactionContext`
//! - Revision checks against the revisions a transaction observed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;

pub use manager::{ActiveTracking, TransactionManager, TransactionMetrics};
pub use transaction::{Transaction, TransactionError, TransactionStatus};
