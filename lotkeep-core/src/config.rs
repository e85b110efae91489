use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default reservation lifetime: five minutes.
pub const DEFAULT_TTL_SECS: u64 = 300;
/// Default background sweep period: one minute.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Reservation lifetime and sweep cadence. The two are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl CoordinatorConfig {
    pub fn from_secs(ttl_secs: u64, sweep_interval_secs: u64) -> Result<Self, ConfigError> {
        let config = Self {
            ttl: Duration::from_secs(ttl_secs),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl.as_millis() as u64
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}
