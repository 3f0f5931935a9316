//! Core types for docindex
//!
//! This crate defines the vocabulary shared by every layer:
//! - Identifiers: [`TxnId`], [`RevisionId`], [`CollectionId`]
//! - Revision records and their shared handles
//! - The [`IndexError`] taxonomy
//! - The [`TransactionContext`] collaborator trait

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod revision;
pub mod traits;
pub mod types;

pub use error::{IndexError, Result};
pub use revision::{RevisionHandle, RevisionRecord};
pub use traits::TransactionContext;
pub use types::{CollectionId, RevisionId, TxnId};
