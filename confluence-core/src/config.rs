//! Strategy parameters and the named-settings boundary.
//!
//! Hosts hand over a loosely typed bag of `name → value` pairs. It is validated
//! once by [`StrategyConfig::apply_settings`]; everything downstream reads the
//! typed struct.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

/// Recognised setting names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    EmaFastPeriod,
    EmaSlowPeriod,
    RsiPeriod,
    RsiLongTrigger,
    RsiExitOverbought,
    BbPeriod,
    BbStdDev,
    ObvSmoothPeriod,
    LookbackPeriods,
}

impl Setting {
    pub const ALL: [Setting; 9] = [
        Setting::EmaFastPeriod,
        Setting::EmaSlowPeriod,
        Setting::RsiPeriod,
        Setting::RsiLongTrigger,
        Setting::RsiExitOverbought,
        Setting::BbPeriod,
        Setting::BbStdDev,
        Setting::ObvSmoothPeriod,
        Setting::LookbackPeriods,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Setting::EmaFastPeriod => "ema-fast-period",
            Setting::EmaSlowPeriod => "ema-slow-period",
            Setting::RsiPeriod => "rsi-period",
            Setting::RsiLongTrigger => "rsi-long-trigger",
            Setting::RsiExitOverbought => "rsi-exit-overbought",
            Setting::BbPeriod => "bb-period",
            Setting::BbStdDev => "bb-std-dev",
            Setting::ObvSmoothPeriod => "obv-smooth-period",
            Setting::LookbackPeriods => "lookback-periods",
        }
    }

    pub fn from_key(key: &str) -> Option<Setting> {
        Setting::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Period-like settings are bar counts and must be at least 1.
    fn is_period(self) -> bool {
        matches!(
            self,
            Setting::EmaFastPeriod
                | Setting::EmaSlowPeriod
                | Setting::RsiPeriod
                | Setting::BbPeriod
                | Setting::ObvSmoothPeriod
                | Setting::LookbackPeriods
        )
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Immutable-per-run parameter set for the multi-indicator strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub rsi_period: usize,
    /// Classic long-entry trigger level. Entry momentum uses the looser
    /// "RSI above 50 or rising" test, so this is carried for reporting only.
    pub rsi_long_trigger: f64,
    pub rsi_exit_overbought: f64,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub obv_smooth_period: usize,
    /// Bars scanned for a lower-band touch.
    pub lookback_periods: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            ema_fast_period: 50,
            ema_slow_period: 200,
            rsi_period: 14,
            rsi_long_trigger: 40.0,
            rsi_exit_overbought: 70.0,
            bb_period: 20,
            bb_std_dev: 2.0,
            obv_smooth_period: 10,
            lookback_periods: 10,
        }
    }
}

impl StrategyConfig {
    /// Build a config from the defaults plus a named-settings bag.
    pub fn from_settings(settings: &BTreeMap<String, Value>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_settings(settings)?;
        Ok(config)
    }

    /// Apply a named-settings update.
    ///
    /// Unknown keys and non-numeric values are rejected. The update is
    /// all-or-nothing: on error `self` is unchanged. Keys not present keep
    /// their current values.
    pub fn apply_settings(
        &mut self,
        settings: &BTreeMap<String, Value>,
    ) -> Result<(), ConfigError> {
        let mut next = self.clone();
        for (key, value) in settings {
            let setting =
                Setting::from_key(key).ok_or_else(|| ConfigError::UnknownSetting(key.clone()))?;
            let number = value.as_f64().ok_or_else(|| ConfigError::InvalidValue {
                key: key.clone(),
                expected: "number",
            })?;
            next.set(setting, number)?;
        }
        *self = next;
        Ok(())
    }

    /// Set one typed value. Periods are truncated to whole bars.
    pub fn set(&mut self, setting: Setting, value: f64) -> Result<(), ConfigError> {
        check(setting, value)?;
        let bars = value.trunc() as usize;
        match setting {
            Setting::EmaFastPeriod => self.ema_fast_period = bars,
            Setting::EmaSlowPeriod => self.ema_slow_period = bars,
            Setting::RsiPeriod => self.rsi_period = bars,
            Setting::RsiLongTrigger => self.rsi_long_trigger = value,
            Setting::RsiExitOverbought => self.rsi_exit_overbought = value,
            Setting::BbPeriod => self.bb_period = bars,
            Setting::BbStdDev => self.bb_std_dev = value,
            Setting::ObvSmoothPeriod => self.obv_smooth_period = bars,
            Setting::LookbackPeriods => self.lookback_periods = bars,
        }
        Ok(())
    }

    /// Re-check every value against the bounds `set` enforces.
    ///
    /// Needed for configs built as struct literals or deserialized directly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Setting::ALL
            .into_iter()
            .try_for_each(|setting| check(setting, self.get(setting)))
    }

    pub fn get(&self, setting: Setting) -> f64 {
        match setting {
            Setting::EmaFastPeriod => self.ema_fast_period as f64,
            Setting::EmaSlowPeriod => self.ema_slow_period as f64,
            Setting::RsiPeriod => self.rsi_period as f64,
            Setting::RsiLongTrigger => self.rsi_long_trigger,
            Setting::RsiExitOverbought => self.rsi_exit_overbought,
            Setting::BbPeriod => self.bb_period as f64,
            Setting::BbStdDev => self.bb_std_dev,
            Setting::ObvSmoothPeriod => self.obv_smooth_period as f64,
            Setting::LookbackPeriods => self.lookback_periods as f64,
        }
    }

    /// Current values as a named-settings map (sorted by key).
    pub fn settings(&self) -> BTreeMap<String, f64> {
        Setting::ALL
            .into_iter()
            .map(|s| (s.key().to_string(), self.get(s)))
            .collect()
    }

    /// blake3 over the canonical (key-sorted) JSON of every parameter value.
    pub fn fingerprint(&self) -> String {
        let canonical: serde_json::Map<String, Value> = self
            .settings()
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        let json = Value::Object(canonical).to_string();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

/// Upper bound on any period, in bars.
pub const MAX_PERIOD: f64 = u32::MAX as f64;

fn check(setting: Setting, value: f64) -> Result<(), ConfigError> {
    let reason = if !value.is_finite() {
        "must be finite"
    } else if setting.is_period() && value < 1.0 {
        "period must be at least 1"
    } else if setting.is_period() && value > MAX_PERIOD {
        "period too large"
    } else {
        return Ok(());
    };
    Err(ConfigError::OutOfRange {
        key: setting.key().to_string(),
        value,
        reason,
    })
}
