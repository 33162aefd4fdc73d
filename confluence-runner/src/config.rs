//! Serializable replay configuration, loaded from TOML.
//!
//! ```toml
//! [strategy]
//! ema-fast-period = 20
//! ema-slow-period = 100
//!
//! [[instruments]]
//! exchange = "kraken"
//! symbol = "SOL-USD"
//! kind = "spot"
//! source = { type = "csv", path = "data/sol.csv" }
//!
//! [[instruments]]
//! exchange = "kraken"
//! symbol = "BTC-PERP"
//! kind = "derivative"
//! source = { type = "synthetic", bars = 500, seed = 7 }
//!
//! [replay]
//! position_size = 1.5
//! parallel = true
//! ```

use confluence_core::{ConfigError, Instrument, InstrumentKind, StrategyConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Content-addressable identifier for a replay configuration.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid run config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Settings(#[from] ConfigError),

    #[error("invalid run config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Named strategy settings, validated by `StrategyConfig::apply_settings`.
    #[serde(default)]
    pub strategy: BTreeMap<String, serde_json::Value>,

    pub instruments: Vec<InstrumentConfig>,

    #[serde(default)]
    pub replay: ReplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentConfig {
    pub exchange: String,
    pub symbol: String,
    pub kind: InstrumentKind,
    pub source: SourceConfig,
}

impl InstrumentConfig {
    pub fn instrument(&self) -> Instrument {
        Instrument::new(self.exchange.clone(), self.symbol.clone(), self.kind)
    }
}

/// Where an instrument's bars come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// `timestamp,close,volume` file.
    Csv { path: PathBuf },

    /// Deterministic random walk.
    Synthetic {
        bars: usize,
        #[serde(default)]
        seed: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplaySettings {
    /// Holding recorded in the paper book after a Buy.
    #[serde(default = "default_position_size")]
    pub position_size: Decimal,

    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_position_size() -> Decimal {
    Decimal::ONE
}

fn default_parallel() -> bool {
    true
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            position_size: default_position_size(),
            parallel: default_parallel(),
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Relative CSV paths are resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, RunConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for instrument in &mut self.instruments {
            if let SourceConfig::Csv { path } = &mut instrument.source {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    /// Structural checks plus a dry run of the strategy settings.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.instruments.is_empty() {
            return Err(RunConfigError::Invalid("no instruments configured".into()));
        }
        if self.replay.position_size <= Decimal::ZERO {
            return Err(RunConfigError::Invalid(format!(
                "position_size must be positive, got {}",
                self.replay.position_size
            )));
        }
        for instrument in &self.instruments {
            if let SourceConfig::Synthetic { bars: 0, .. } = instrument.source {
                return Err(RunConfigError::Invalid(format!(
                    "{} synthetic source needs at least one bar",
                    instrument.instrument()
                )));
            }
        }
        self.strategy_config()?;
        Ok(())
    }

    pub fn strategy_config(&self) -> Result<StrategyConfig, RunConfigError> {
        Ok(StrategyConfig::from_settings(&self.strategy)?)
    }

    /// Computes a deterministic hash ID for this configuration.
    pub fn run_id(&self) -> Result<RunId, RunConfigError> {
        let json = serde_json::to_string(self)
            .map_err(|e| RunConfigError::Invalid(format!("unserializable config: {e}")))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
