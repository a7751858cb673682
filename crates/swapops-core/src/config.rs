//! Console configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! battery_removal = "apply_then_reconcile"
//! log_filter = "swapops_core=debug,info"
//! search_min_chars = 2
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// When local state is updated relative to the remote write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPolicy {
    /// Apply locally only after the remote call succeeds
    #[default]
    ConfirmThenApply,
    /// Patch locally first, then re-fetch to reconcile
    ApplyThenReconcile,
}

/// Console configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Policy for battery removal; status changes are always confirm-then-apply
    pub battery_removal: ConsistencyPolicy,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Search queries shorter than this (after trimming) do not filter
    pub search_min_chars: usize,
}

impl ConsoleConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With battery removal policy
    #[inline]
    #[must_use]
    pub fn with_battery_removal(mut self, policy: ConsistencyPolicy) -> Self {
        self.battery_removal = policy;
        self
    }

    /// With default log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// With minimum search length
    #[inline]
    #[must_use]
    pub fn with_search_min_chars(mut self, min: usize) -> Self {
        self.search_min_chars = min;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed TOML or unknown enum values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` on malformed content
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            battery_removal: ConsistencyPolicy::ConfirmThenApply,
            log_filter: "info".to_string(),
            search_min_chars: 1,
        }
    }
}
