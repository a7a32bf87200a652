use serde::{Deserialize, Serialize};

use crate::errors::{LoanError, Result};

/// default grace period before an unpaid installment counts as overdue
pub const DEFAULT_OVERDUE_THRESHOLD_DAYS: u32 = 1;

/// portfolio size at which overdue detection fans out across threads
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

/// engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// grace days used when the caller does not pass a threshold
    pub overdue_threshold_days: u32,
    /// minimum portfolio size for parallel detection (needs the `parallel` feature)
    pub parallel_threshold: usize,
    /// keep generated schedules keyed by loan id
    pub cache_schedules: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overdue_threshold_days: DEFAULT_OVERDUE_THRESHOLD_DAYS,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            cache_schedules: true,
        }
    }
}

impl EngineConfig {
    /// parse configuration from json, missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallel_threshold == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "parallel_threshold must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_overdue_threshold(mut self, days: u32) -> Self {
        self.overdue_threshold_days = days;
        self
    }

    pub fn with_parallel_threshold(mut self, loans: usize) -> Self {
        self.parallel_threshold = loans;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_schedules = false;
        self
    }
}
