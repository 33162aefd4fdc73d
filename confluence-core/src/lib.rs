//! Confluence Core: rule-based multi-indicator signal evaluation.
//!
//! This crate holds everything the decision engine needs and nothing that
//! touches I/O:
//! - Domain types (instruments, position and holding snapshots)
//! - Indicator math (EMA, Wilder RSI, Bollinger bands, OBV)
//! - Missing-data sanitizer and lower-band touch detector
//! - Entry/exit logic with per-instrument condition tracking
//! - The strategy facade hosts call once per instrument per bar
//!
//! Market data and positions come in through the [`host::MarketData`] and
//! [`host::PositionBook`] traits.

pub mod config;
pub mod domain;
pub mod error;
pub mod host;
pub mod indicators;
pub mod pipeline;
pub mod sanitize;
pub mod signal;
pub mod strategy;

pub use config::{Setting, StrategyConfig};
pub use domain::{HoldingSnapshot, Instrument, InstrumentKind, PositionSnapshot};
pub use error::{BatchFailure, ConfigError, EvalError, HostError};
pub use host::{LatestBar, MarketData, PositionBook};
pub use signal::{Decision, Direction};
pub use strategy::{BatchOutcome, Strategy};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across batch worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Instrument>();
        require_sync::<Instrument>();
        require_send::<PositionSnapshot>();
        require_sync::<PositionSnapshot>();
        require_send::<HoldingSnapshot>();
        require_sync::<HoldingSnapshot>();
        require_send::<LatestBar>();
        require_sync::<LatestBar>();

        require_send::<StrategyConfig>();
        require_sync::<StrategyConfig>();
        require_send::<pipeline::IndicatorPipeline>();
        require_sync::<pipeline::IndicatorPipeline>();
        require_send::<pipeline::IndicatorSnapshot>();
        require_sync::<pipeline::IndicatorSnapshot>();
        require_send::<signal::ConditionTracker>();
        require_sync::<signal::ConditionTracker>();

        require_send::<Decision>();
        require_sync::<Decision>();
        require_send::<EvalError>();
        require_sync::<EvalError>();
        require_send::<Strategy>();
        require_sync::<Strategy>();
    }
}
