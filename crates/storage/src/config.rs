//! Index configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slot count of a freshly created index
pub const DEFAULT_INITIAL_CAPACITY: usize = 128;

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ConfigError {
    /// Offending field
    pub field: &'static str,
    /// What is wrong with it
    pub reason: String,
}

/// Sizing options for a [`VersionedIndex`](crate::VersionedIndex)
///
/// ```
/// use docindex_storage::IndexConfig;
///
/// let config = IndexConfig::default().with_max_capacity(1 << 20);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Slots allocated at creation
    pub initial_capacity: usize,
    /// Upper bound on the slot array; unbounded when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<usize>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: None,
        }
    }
}

impl IndexConfig {
    /// Set the initial slot count
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Cap the slot array size
    pub fn with_max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError {
                field: "initial_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(max) = self.max_capacity {
            if max < self.initial_capacity {
                return Err(ConfigError {
                    field: "max_capacity",
                    reason: format!(
                        "{} is below initial_capacity {}",
                        max, self.initial_capacity
                    ),
                });
            }
        }
        Ok(())
    }

    /// Capacity to grow to from `current`, or `None` if the limit forbids it
    pub(crate) fn next_capacity(&self, current: usize) -> Option<usize> {
        let doubled = current.checked_mul(2)?.checked_add(1)?;
        match self.max_capacity {
            None => Some(doubled),
            Some(max) if max > current => Some(doubled.min(max)),
            Some(_) => None,
        }
    }
}
