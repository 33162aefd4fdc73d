//! The multi-indicator strategy: per-bar evaluation against a host.
//!
//! One call per instrument per bar. The only state carried between calls is
//! the per-instrument [`ConditionTracker`]; everything else is recomputed from
//! the host's history.

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::config::StrategyConfig;
use crate::domain::{Instrument, InstrumentKind};
use crate::error::{BatchFailure, ConfigError, EvalError, HostError};
use crate::host::{MarketData, PositionBook};
use crate::pipeline::{IndicatorPipeline, IndicatorSnapshot};
use crate::sanitize::forward_fill;
use crate::signal::entry::entry_conditions;
use crate::signal::{evaluate_entry, evaluate_exit, ConditionTracker, Decision, Direction};

pub const NAME: &str = "multiindicator";

const DESCRIPTION: &str = "Multi-indicator confluence strategy: EMA trend filter as a mandatory \
gate, then at least two of RSI momentum, Bollinger band structure and OBV volume confirmation";

/// Result of a simultaneous batch. Both lists keep the input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub decisions: Vec<Decision>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Strategy {
    config: StrategyConfig,
    pipeline: IndicatorPipeline,
    trackers: HashMap<Instrument, ConditionTracker>,
    parallel: bool,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::from_valid(StrategyConfig::default())
    }
}

impl Strategy {
    /// Fails when `config` holds a value `apply_settings` would reject.
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Defaults plus a named-settings bag.
    pub fn with_settings(settings: &BTreeMap<String, Value>) -> Result<Self, ConfigError> {
        Ok(Self::from_valid(StrategyConfig::from_settings(settings)?))
    }

    fn from_valid(config: StrategyConfig) -> Self {
        Self {
            pipeline: IndicatorPipeline::build(&config),
            config,
            trackers: HashMap::new(),
            parallel: true,
        }
    }

    /// Enables or disables parallel evaluation of simultaneous batches.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn name(&self) -> &'static str {
        NAME
    }

    pub fn description(&self) -> &'static str {
        DESCRIPTION
    }

    pub fn supports_simultaneous_processing(&self) -> bool {
        true
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Apply a named-settings update. On error nothing changes.
    pub fn apply_settings(
        &mut self,
        settings: &BTreeMap<String, Value>,
    ) -> Result<(), ConfigError> {
        self.config.apply_settings(settings)?;
        self.pipeline = IndicatorPipeline::build(&self.config);
        Ok(())
    }

    pub fn tracker(&self, instrument: &Instrument) -> Option<&ConditionTracker> {
        self.trackers.get(instrument)
    }

    /// Forget every instrument's condition history.
    pub fn reset(&mut self) {
        self.trackers.clear();
    }

    /// Evaluate one instrument at the host's current bar.
    pub fn on_signal(
        &mut self,
        data: Option<&dyn MarketData>,
        book: &dyn PositionBook,
    ) -> Result<Decision, EvalError> {
        let data = data.ok_or(EvalError::NilInput)?;
        let instrument = data.instrument();
        let mut tracker = self.trackers.remove(instrument);
        let result = evaluate_instrument(&self.config, &self.pipeline, data, book, &mut tracker);
        if let Some(tracker) = tracker {
            self.trackers.insert(instrument.clone(), tracker);
        }
        result
    }

    /// Evaluate several instruments for the same bar.
    ///
    /// Each feed is evaluated independently; a failure is recorded and the
    /// rest of the batch carries on. Only the first occurrence of an
    /// instrument is evaluated.
    pub fn on_simultaneous_signals(
        &mut self,
        feeds: &[&dyn MarketData],
        book: &dyn PositionBook,
    ) -> BatchOutcome {
        struct Job<'a> {
            index: usize,
            feed: &'a dyn MarketData,
            tracker: Option<ConditionTracker>,
        }

        let mut seen = HashSet::new();
        let mut failures: Vec<(usize, BatchFailure)> = Vec::new();
        let mut jobs: Vec<Job<'_>> = Vec::with_capacity(feeds.len());

        for (index, &feed) in feeds.iter().enumerate() {
            let instrument = feed.instrument();
            if !seen.insert(instrument.clone()) {
                failures.push((
                    index,
                    BatchFailure {
                        instrument: instrument.clone(),
                        error: EvalError::DuplicateInstrument(instrument.clone()),
                    },
                ));
                continue;
            }
            let tracker = self.trackers.remove(instrument);
            jobs.push(Job {
                index,
                feed,
                tracker,
            });
        }

        let config = &self.config;
        let pipeline = &self.pipeline;
        let results: Vec<Result<Decision, EvalError>> = if self.parallel {
            jobs.par_iter_mut()
                .map(|job| evaluate_instrument(config, pipeline, job.feed, book, &mut job.tracker))
                .collect()
        } else {
            jobs.iter_mut()
                .map(|job| evaluate_instrument(config, pipeline, job.feed, book, &mut job.tracker))
                .collect()
        };

        let mut decisions = Vec::with_capacity(jobs.len());
        for (job, result) in jobs.into_iter().zip(results) {
            let instrument = job.feed.instrument().clone();
            match result {
                Ok(decision) => decisions.push(decision),
                Err(error) => {
                    warn!(instrument = %instrument, error = %error, "batch member failed");
                    failures.push((
                        job.index,
                        BatchFailure {
                            instrument: instrument.clone(),
                            error,
                        },
                    ));
                }
            }
            if let Some(tracker) = job.tracker {
                self.trackers.insert(instrument, tracker);
            }
        }

        failures.sort_by_key(|(index, _)| *index);
        BatchOutcome {
            decisions,
            failures: failures.into_iter().map(|(_, f)| f).collect(),
        }
    }
}

/// Full evaluation of one instrument against the host.
///
/// `tracker` is created on the first entry evaluation and only touched by
/// entry logic.
pub fn evaluate_instrument(
    config: &StrategyConfig,
    pipeline: &IndicatorPipeline,
    data: &dyn MarketData,
    book: &dyn PositionBook,
    tracker: &mut Option<ConditionTracker>,
) -> Result<Decision, EvalError> {
    let instrument = data.instrument();
    let latest = data.latest()?;
    let mut decision = Decision::new(instrument.clone(), &latest);

    if latest.offset <= config.ema_slow_period {
        decision.append_reason(format!(
            "Not enough data for signal generation, need {} periods, have {}",
            config.ema_slow_period, latest.offset
        ));
        debug!(instrument = %instrument, offset = latest.offset, "awaiting history");
        return Ok(decision);
    }

    let raw_closes = data.stream_close()?;
    let raw_volumes = data.stream_volume()?;
    validate_series(&raw_closes, &raw_volumes)?;

    let sanitized = forward_fill(&raw_closes, config.ema_slow_period, latest.time)
        .and_then(|closes| {
            forward_fill(&raw_volumes, config.ema_slow_period, latest.time)
                .map(|volumes| (closes, volumes))
        });
    let (closes, volumes) = match sanitized {
        Ok(pair) => pair,
        Err(err) => {
            warn!(
                instrument = %instrument,
                offset = latest.offset,
                error = %err,
                "series rejected"
            );
            return Err(err);
        }
    };

    let snap = pipeline.snapshot(&closes, &volumes)?;

    if !data.has_data_at(latest.time)? {
        decision.direction = Direction::MissingData;
        decision.append_reason(format!("missing data at {}", latest.time));
        debug!(instrument = %instrument, offset = latest.offset, "missing data");
        return Ok(decision);
    }

    if has_open_position(instrument, book)? {
        decision.apply(evaluate_exit(config, &snap));
    } else {
        let tracker = tracker.get_or_insert_with(ConditionTracker::default);
        decision.apply(evaluate_entry(config, &snap, tracker));
    }
    decision.append_reason(indicator_summary(config, &snap));

    debug!(
        instrument = %instrument,
        offset = latest.offset,
        direction = %decision.direction,
        flexible_met = entry_conditions(config, &snap).flexible_met,
        "decision"
    );
    Ok(decision)
}

fn validate_series(closes: &[Decimal], volumes: &[Decimal]) -> Result<(), EvalError> {
    if closes.is_empty() {
        return Err(EvalError::EmptySeries);
    }
    if closes.len() != volumes.len() {
        return Err(EvalError::SeriesMismatch {
            closes: closes.len(),
            volumes: volumes.len(),
        });
    }
    if let Some(index) = volumes.iter().position(|v| v.is_sign_negative() && !v.is_zero()) {
        return Err(EvalError::NegativeVolume { index });
    }
    Ok(())
}

/// Whether the book holds a position above the dust threshold for `instrument`.
pub fn has_open_position(
    instrument: &Instrument,
    book: &dyn PositionBook,
) -> Result<bool, HostError> {
    let open = match instrument.kind {
        InstrumentKind::Derivative => book
            .positions(instrument)?
            .iter()
            .any(|p| p.instrument == *instrument && p.is_meaningful()),
        InstrumentKind::Spot => book
            .holdings()?
            .iter()
            .any(|h| h.instrument == *instrument && h.is_meaningful()),
    };
    Ok(open)
}

fn indicator_summary(config: &StrategyConfig, snap: &IndicatorSnapshot) -> String {
    format!(
        "Indicators: EMA{}={:.2} EMA{}={:.2} RSI={:.2}(prev={:.2}) BB_mid={:.2} \
         Close={:.2} OBV_slope={:.4} touched_lower={}",
        config.ema_fast_period,
        snap.ema_fast,
        config.ema_slow_period,
        snap.ema_slow,
        snap.rsi,
        snap.rsi_prev,
        snap.bb_middle,
        snap.close,
        snap.obv_slope,
        snap.touched_lower
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HoldingSnapshot, PositionSnapshot};
    use rust_decimal_macros::dec;
    use serde_json::json;

    struct Book {
        positions: Vec<PositionSnapshot>,
        holdings: Vec<HoldingSnapshot>,
    }

    impl PositionBook for Book {
        fn positions(&self, _: &Instrument) -> Result<Vec<PositionSnapshot>, HostError> {
            Ok(self.positions.clone())
        }

        fn holdings(&self) -> Result<Vec<HoldingSnapshot>, HostError> {
            Ok(self.holdings.clone())
        }
    }

    #[test]
    fn identity() {
        let s = Strategy::default();
        assert_eq!(s.name(), "multiindicator");
        assert!(s.description().contains("EMA trend filter"));
        assert!(s.supports_simultaneous_processing());
    }

    #[test]
    fn derivative_dust_is_flat() {
        let perp = Instrument::derivative("kraken", "BTC-PERP");
        let book = Book {
            positions: vec![PositionSnapshot {
                instrument: perp.clone(),
                latest_size: dec!(0.000009),
            }],
            holdings: vec![],
        };
        assert!(!has_open_position(&perp, &book).unwrap());
    }

    #[test]
    fn spot_holding_above_threshold_is_open() {
        let sol = Instrument::spot("kraken", "SOL-USD");
        let book = Book {
            positions: vec![],
            holdings: vec![HoldingSnapshot {
                instrument: sol.clone(),
                base_size: dec!(0.02),
            }],
        };
        assert!(has_open_position(&sol, &book).unwrap());
    }

    #[test]
    fn holding_of_another_instrument_is_ignored() {
        let sol = Instrument::spot("kraken", "SOL-USD");
        let book = Book {
            positions: vec![],
            holdings: vec![HoldingSnapshot {
                instrument: Instrument::spot("kraken", "ETH-USD"),
                base_size: dec!(5),
            }],
        };
        assert!(!has_open_position(&sol, &book).unwrap());
    }

    #[test]
    fn apply_settings_rebuilds_and_is_atomic() {
        let mut s = Strategy::default();
        let mut bag = BTreeMap::new();
        bag.insert("ema-slow-period".to_string(), json!(100));
        s.apply_settings(&bag).unwrap();
        assert_eq!(s.config().ema_slow_period, 100);

        bag.insert("nope".to_string(), json!(1));
        assert!(s.apply_settings(&bag).is_err());
        assert_eq!(s.config().ema_slow_period, 100);
    }

    #[test]
    fn new_rejects_unvalidated_config() {
        let config = StrategyConfig {
            ema_fast_period: 0,
            ..StrategyConfig::default()
        };
        let err = Strategy::new(config).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { ref key, .. } if key == "ema-fast-period"));

        let huge = StrategyConfig {
            rsi_period: usize::MAX,
            ..StrategyConfig::default()
        };
        assert!(Strategy::new(huge).is_err());
        assert!(Strategy::new(StrategyConfig::default()).is_ok());
    }

    #[test]
    fn validate_series_rejects_negative_volume() {
        let err = validate_series(&[dec!(1), dec!(2)], &[dec!(5), dec!(-1)]).unwrap_err();
        assert_eq!(err, EvalError::NegativeVolume { index: 1 });
    }

    #[test]
    fn summary_uses_configured_periods() {
        let snap = IndicatorSnapshot {
            close: 101.0,
            ema_fast: 100.5,
            ema_slow: 99.25,
            rsi: 55.0,
            rsi_prev: 52.5,
            bb_middle: 100.0,
            obv_slope: 12.5,
            touched_lower: false,
        };
        assert_eq!(
            indicator_summary(&StrategyConfig::default(), &snap),
            "Indicators: EMA50=100.50 EMA200=99.25 RSI=55.00(prev=52.50) BB_mid=100.00 \
             Close=101.00 OBV_slope=12.5000 touched_lower=false"
        );
    }
}
