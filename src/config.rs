//! Tracker configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::*;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_MAX_BACKFILL_DAYS: i64 = 3_650;
pub const DEFAULT_LOG_FILTER: &str = "card_balance_core=info";

/// Limits and logging settings for the balance tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Largest number of observations accepted for one card in one submission
    pub max_batch_size: usize,
    /// How far before today an observation may be dated
    pub max_backfill_days: i64,
    /// `tracing` filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_backfill_days: DEFAULT_MAX_BACKFILL_DAYS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> BalanceResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BalanceError::Config(format!("Invalid TOML configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> BalanceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BalanceError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> BalanceResult<()> {
        if self.max_batch_size == 0 {
            return Err(BalanceError::Config(
                "max_batch_size must be greater than zero".to_string(),
            ));
        }

        if self.max_backfill_days <= 0 {
            return Err(BalanceError::Config(
                "max_backfill_days must be greater than zero".to_string(),
            ));
        }

        if self.log_filter.trim().is_empty() {
            return Err(BalanceError::Config("log_filter cannot be empty".to_string()));
        }

        Ok(())
    }
}
