//! Convenient imports for docindex.
//!
//! ```ignore
//! use docindex::prelude::*;
//!
//! let docs = DocumentCollection::new("docs");
//! ```

// Main entry point
pub use crate::collection::{CollectionBuilder, Document, DocumentCollection};

// Configuration
pub use crate::config::CollectionConfig;
pub use docindex_concurrency::ActiveTracking;

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use docindex_concurrency::Transaction;
pub use docindex_core::{RevisionId, TxnId};

// Re-export serde_json for convenience
pub use serde_json::json;
