//! Bar-by-bar replay of a run config through the simultaneous batch API.

use confluence_core::{ConfigError, Decision, Direction, Instrument, MarketData, Strategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::book::PaperBook;
use crate::config::{RunConfig, RunConfigError, RunId, SourceConfig};
use crate::feed::{load_csv, synthetic_series, FeedError, SeriesFeed};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Config(#[from] RunConfigError),

    #[error(transparent)]
    Settings(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Per-instrument decision counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub instrument: Instrument,
    pub bars: usize,
    pub buys: usize,
    pub sells: usize,
    pub holds: usize,
    pub missing: usize,
    pub failures: usize,
}

impl InstrumentSummary {
    fn new(instrument: Instrument, bars: usize) -> Self {
        Self {
            instrument,
            bars,
            buys: 0,
            sells: 0,
            holds: 0,
            missing: 0,
            failures: 0,
        }
    }

    fn record(&mut self, direction: Direction) {
        match direction {
            Direction::Buy => self.buys += 1,
            Direction::Sell => self.sells += 1,
            Direction::DoNothing => self.holds += 1,
            Direction::MissingData => self.missing += 1,
        }
    }
}

/// A batch member that failed at one replay step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub step: usize,
    pub instrument: Instrument,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub run_id: RunId,
    /// Fingerprint of the effective strategy parameters.
    pub fingerprint: String,
    pub strategy: String,
    pub settings: BTreeMap<String, f64>,
    pub steps: usize,
    pub instruments: Vec<InstrumentSummary>,
    /// Every decision that was not `DoNothing`, in replay order.
    pub decisions: Vec<Decision>,
    pub failures: Vec<FailureRecord>,
}

impl ReplayReport {
    pub fn summary(&self, instrument: &Instrument) -> Option<&InstrumentSummary> {
        self.instruments.iter().find(|s| s.instrument == *instrument)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Build the feeds described by `config`, nothing visible yet.
pub fn build_feeds(config: &RunConfig) -> Result<Vec<SeriesFeed>, FeedError> {
    config
        .instruments
        .iter()
        .map(|ic| {
            let rows = match &ic.source {
                SourceConfig::Csv { path } => load_csv(path)?,
                SourceConfig::Synthetic { bars, seed } => {
                    synthetic_series(&ic.symbol, *bars, *seed)
                }
            };
            Ok(SeriesFeed::new(ic.instrument(), rows))
        })
        .collect()
}

/// Replay every configured instrument from its first bar to its last.
///
/// Each step reveals one more bar of every feed that still has bars and
/// evaluates those feeds as one batch. Buys and sells update a paper book
/// that the next step sees.
pub fn replay(config: &RunConfig) -> Result<ReplayReport, ReplayError> {
    config.validate()?;
    let feeds = build_feeds(config)?;
    replay_feeds(config, feeds)
}

/// Replay pre-built feeds under `config`'s strategy and replay settings.
pub fn replay_feeds(
    config: &RunConfig,
    mut feeds: Vec<SeriesFeed>,
) -> Result<ReplayReport, ReplayError> {
    let run_id = config.run_id()?;
    let mut strategy =
        Strategy::with_settings(&config.strategy)?.with_parallelism(config.replay.parallel);
    let position_size = config.replay.position_size;
    let mut book = PaperBook::new();

    let mut summaries: Vec<InstrumentSummary> = feeds
        .iter()
        .map(|f| InstrumentSummary::new(f.instrument().clone(), f.len()))
        .collect();
    let mut decisions = Vec::new();
    let mut failures = Vec::new();

    info!(
        run_id = %run_id,
        instruments = feeds.len(),
        parallel = config.replay.parallel,
        "replay started"
    );

    let mut step = 0usize;
    loop {
        let advanced: Vec<bool> = feeds.iter_mut().map(SeriesFeed::advance).collect();
        if !advanced.iter().any(|&a| a) {
            break;
        }
        step += 1;

        let active: Vec<&dyn MarketData> = feeds
            .iter()
            .zip(&advanced)
            .filter(|(_, a)| **a)
            .map(|(f, _)| f as &dyn MarketData)
            .collect();
        let outcome = strategy.on_simultaneous_signals(&active, &book);

        for decision in outcome.decisions {
            if let Some(summary) = summaries
                .iter_mut()
                .find(|s| s.instrument == decision.instrument)
            {
                summary.record(decision.direction);
            }
            book.apply(&decision, position_size);
            if decision.direction != Direction::DoNothing {
                decisions.push(decision);
            }
        }
        for failure in outcome.failures {
            if let Some(summary) = summaries
                .iter_mut()
                .find(|s| s.instrument == failure.instrument)
            {
                summary.failures += 1;
            }
            failures.push(FailureRecord {
                step,
                message: failure.error.to_string(),
                instrument: failure.instrument,
            });
        }
    }

    info!(
        run_id = %run_id,
        steps = step,
        decisions = decisions.len(),
        failures = failures.len(),
        "replay finished"
    );

    Ok(ReplayReport {
        run_id,
        fingerprint: strategy.config().fingerprint(),
        strategy: strategy.name().to_string(),
        settings: strategy.config().settings(),
        steps: step,
        instruments: summaries,
        decisions,
        failures,
    })
}
