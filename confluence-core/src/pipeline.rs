//! Indicator pipeline: cleaned close/volume history → latest readings.
//!
//! Recomputed from the full history on every call.

use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::error::{ConfigError, EvalError};
use crate::indicators::{bollinger_bands, ema_of_series, on_balance_volume, Ema, Indicator, Rsi};
use crate::signal::band_touch::touched_lower_band;

/// Full indicator series, index-aligned with the input closes.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    pub ema_fast: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub rsi: Vec<f64>,
    pub bb_middle: Vec<f64>,
    pub bb_lower: Vec<f64>,
    pub obv: Vec<f64>,
    pub obv_smoothed: Vec<f64>,
}

/// Indicator readings at the latest bar.
///
/// `rsi_prev` and `obv_slope` are 0 when fewer than two samples exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub rsi_prev: f64,
    pub bb_middle: f64,
    /// Smoothed OBV, current minus previous.
    pub obv_slope: f64,
    pub touched_lower: bool,
}

#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    ema_fast: Ema,
    ema_slow: Ema,
    rsi: Rsi,
    bb_period: usize,
    bb_std_dev: f64,
    obv_smooth_period: usize,
    lookback: usize,
}

impl IndicatorPipeline {
    pub fn new(config: &StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// `config` has already passed `StrategyConfig::validate`.
    pub(crate) fn build(config: &StrategyConfig) -> Self {
        Self {
            ema_fast: Ema::new(config.ema_fast_period),
            ema_slow: Ema::new(config.ema_slow_period),
            rsi: Rsi::new(config.rsi_period),
            bb_period: config.bb_period,
            bb_std_dev: config.bb_std_dev,
            obv_smooth_period: config.obv_smooth_period,
            lookback: config.lookback_periods,
        }
    }

    /// Compute every series over the whole history.
    pub fn compute(&self, closes: &[f64], volumes: &[f64]) -> Result<IndicatorSeries, EvalError> {
        if closes.is_empty() {
            return Err(EvalError::EmptySeries);
        }
        if closes.len() != volumes.len() {
            return Err(EvalError::SeriesMismatch {
                closes: closes.len(),
                volumes: volumes.len(),
            });
        }

        let bands = bollinger_bands(closes, self.bb_period, self.bb_std_dev);
        let obv = on_balance_volume(closes, volumes);
        let obv_smoothed = ema_of_series(&obv, self.obv_smooth_period);

        Ok(IndicatorSeries {
            ema_fast: self.ema_fast.compute(closes),
            ema_slow: self.ema_slow.compute(closes),
            rsi: self.rsi.compute(closes),
            bb_middle: bands.middle,
            bb_lower: bands.lower,
            obv,
            obv_smoothed,
        })
    }

    /// Compute and reduce to the latest readings.
    pub fn snapshot(
        &self,
        closes: &[f64],
        volumes: &[f64],
    ) -> Result<IndicatorSnapshot, EvalError> {
        let series = self.compute(closes, volumes)?;
        Ok(series.snapshot(closes, self.lookback))
    }
}

fn last(series: &[f64]) -> f64 {
    series.last().copied().unwrap_or(f64::NAN)
}

fn previous(series: &[f64]) -> Option<f64> {
    series.len().checked_sub(2).map(|i| series[i])
}

impl IndicatorSeries {
    pub fn snapshot(&self, closes: &[f64], lookback: usize) -> IndicatorSnapshot {
        let obv_slope = previous(&self.obv_smoothed)
            .map(|prev| last(&self.obv_smoothed) - prev)
            .unwrap_or(0.0);

        IndicatorSnapshot {
            close: last(closes),
            ema_fast: last(&self.ema_fast),
            ema_slow: last(&self.ema_slow),
            rsi: last(&self.rsi),
            rsi_prev: previous(&self.rsi).unwrap_or(0.0),
            bb_middle: last(&self.bb_middle),
            obv_slope,
            touched_lower: touched_lower_band(closes, &self.bb_lower, lookback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    fn rising(n: usize) -> (Vec<f64>, Vec<f64>) {
        let closes = (0..n).map(|i| 100.0 + i as f64).collect();
        let volumes = vec![1_000.0; n];
        (closes, volumes)
    }

    #[test]
    fn series_lengths_match_input() {
        let (closes, volumes) = rising(260);
        let series = IndicatorPipeline::new(&StrategyConfig::default())
            .unwrap()
            .compute(&closes, &volumes)
            .unwrap();
        for s in [
            &series.ema_fast,
            &series.ema_slow,
            &series.rsi,
            &series.bb_middle,
            &series.bb_lower,
            &series.obv,
            &series.obv_smoothed,
        ] {
            assert_eq!(s.len(), 260);
        }
    }

    #[test]
    fn rising_market_snapshot() {
        let (closes, volumes) = rising(260);
        let snap = IndicatorPipeline::new(&StrategyConfig::default())
            .unwrap()
            .snapshot(&closes, &volumes)
            .unwrap();

        assert_approx(snap.close, 359.0, 1e-9);
        assert!(snap.ema_fast > snap.ema_slow);
        assert_approx(snap.rsi, 100.0, 1e-9);
        assert!(snap.obv_slope > 0.0);
        // a steady climb never sits on the lower band
        assert!(!snap.touched_lower);
        // middle band = mean of last 20 closes
        assert_approx(snap.bb_middle, 349.5, 1e-9);
    }

    #[test]
    fn empty_input_rejected() {
        let err = IndicatorPipeline::new(&StrategyConfig::default())
            .unwrap()
            .compute(&[], &[])
            .unwrap_err();
        assert_eq!(err, EvalError::EmptySeries);
    }

    #[test]
    fn misaligned_input_rejected() {
        let err = IndicatorPipeline::new(&StrategyConfig::default())
            .unwrap()
            .compute(&[1.0, 2.0], &[1.0])
            .unwrap_err();
        assert_eq!(err, EvalError::SeriesMismatch { closes: 2, volumes: 1 });
    }

    #[test]
    fn unvalidated_config_rejected() {
        let config = StrategyConfig {
            rsi_period: 0,
            ..StrategyConfig::default()
        };
        let err = IndicatorPipeline::new(&config).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { ref key, .. } if key == "rsi-period"));
    }

    #[test]
    fn single_sample_has_zero_previous_readings() {
        let snap = IndicatorPipeline::new(&StrategyConfig::default())
            .unwrap()
            .snapshot(&[100.0], &[10.0])
            .unwrap();
        assert_eq!(snap.rsi_prev, 0.0);
        assert_eq!(snap.obv_slope, 0.0);
        assert!(snap.ema_fast.is_nan());
    }
}
