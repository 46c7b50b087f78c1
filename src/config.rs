//! Layered configuration for the risk and recovery policy.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`RESOURCING_` prefix, `__` between section and key)
//! 2. A TOML file (`--config`, or `resourcing-forecast.toml` in the working directory)
//! 3. Built-in defaults
//!
//! `RESOURCING_THRESHOLDS__RECOVERY_PERCENT=75` maps to `thresholds.recovery_percent`.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "resourcing-forecast.toml";

const fn default_low_buffer_percent() -> f64 {
    5.0
}

const fn default_recovery_percent() -> f64 {
    80.0
}

const fn default_low_variance() -> f64 {
    0.9
}

const fn default_high_variance() -> f64 {
    1.1
}

const fn default_recent_weeks() -> usize {
    4
}

/// At-risk policy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RiskThresholds {
    /// Forecast buffer (percent of the high hours envelope) below which a
    /// project is tagged "Low buffer".
    #[serde(default = "default_low_buffer_percent")]
    pub low_buffer_percent: f64,

    /// Recovery percent below which recovery rules fire.
    #[serde(default = "default_recovery_percent")]
    pub recovery_percent: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_buffer_percent: default_low_buffer_percent(),
            recovery_percent: default_recovery_percent(),
        }
    }
}

/// Utilization band considered on track, as actual / planned ratios.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ResourcingThresholds {
    #[serde(default = "default_low_variance")]
    pub low_variance: f64,
    #[serde(default = "default_high_variance")]
    pub high_variance: f64,
}

impl Default for ResourcingThresholds {
    fn default() -> Self {
        Self {
            low_variance: default_low_variance(),
            high_variance: default_high_variance(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RecoveryConfig {
    /// Weeks before the current week in the rolling recovery window.
    #[serde(default = "default_recent_weeks")]
    pub recent_weeks: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            recent_weeks: default_recent_weeks(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub thresholds: RiskThresholds,
    #[serde(default)]
    pub resourcing: ResourcingThresholds,
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

impl EngineConfig {
    /// Load from defaults, the given TOML file (or the default file if it
    /// exists), and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }

        figment.merge(Env::prefixed("RESOURCING_").split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recovery.recent_weeks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "recovery.recent_weeks".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.resourcing.low_variance > self.resourcing.high_variance {
            return Err(ConfigError::InvalidValue {
                field: "resourcing.low_variance".to_string(),
                reason: format!(
                    "{} is above resourcing.high_variance {}",
                    self.resourcing.low_variance, self.resourcing.high_variance
                ),
            });
        }
        Ok(())
    }
}
