//! Engine configuration
//!
//! One aggregate config covering the whole pipeline, loadable from a JSON
//! file for the binary and constructed in code by tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sextant_risk::RiskConfig;
use sextant_signal::AggregatorConfig;
use sextant_strategy::SelectorConfig;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Paper-trading capital at start
    pub initial_capital: Decimal,
    /// Fixed universe of symbols evaluated each cycle
    pub universe: Vec<String>,
    /// Seconds between cycle ticks
    pub cycle_interval_secs: u64,
    pub aggregator: AggregatorConfig,
    pub selector: SelectorConfig,
    pub risk: RiskConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            universe: vec![
                "AAPL".to_string(),
                "MSFT".to_string(),
                "NVDA".to_string(),
                "AMZN".to_string(),
                "GOOG".to_string(),
            ],
            cycle_interval_secs: 300,
            aggregator: AggregatorConfig::default(),
            selector: SelectorConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.is_empty() {
            return Err(ConfigError::Invalid("empty trading universe".to_string()));
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "initial capital must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
