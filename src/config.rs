//! Collection configuration.
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! active_tracking = "tracked"
//!
//! [index]
//! initial_capacity = 1024
//! max_capacity = 1048576
//! ```

use crate::error::Result;
use docindex_concurrency::ActiveTracking;
use docindex_storage::IndexConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a [`DocumentCollection`](crate::DocumentCollection)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionConfig {
    /// How "is transaction active" is answered during visibility checks
    pub active_tracking: ActiveTracking,
    /// Primary index sizing
    pub index: IndexConfig,
}

impl CollectionConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.index.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
