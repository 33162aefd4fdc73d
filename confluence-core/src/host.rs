//! Interfaces the evaluator needs from its host.
//!
//! The host owns market data, holdings and order execution. The evaluator only
//! reads through these traits; any `Err` is surfaced to the caller unchanged.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{HoldingSnapshot, Instrument, PositionSnapshot};
use crate::error::HostError;

/// The bar at the host's current time cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestBar {
    /// Number of bars processed so far, including this one.
    pub offset: usize,
    pub time: NaiveDateTime,
    pub close: Decimal,
}

/// Market data for one instrument, up to and including the current bar.
pub trait MarketData: Send + Sync {
    fn instrument(&self) -> &Instrument;

    fn latest(&self) -> Result<LatestBar, HostError>;

    /// Close prices in chronological order.
    fn stream_close(&self) -> Result<Vec<Decimal>, HostError>;

    /// Volumes, index-aligned with `stream_close`.
    fn stream_volume(&self) -> Result<Vec<Decimal>, HostError>;

    /// Whether the feed holds a real sample at exactly `time`.
    fn has_data_at(&self, time: NaiveDateTime) -> Result<bool, HostError>;
}

/// Position and holdings lookup.
pub trait PositionBook: Send + Sync {
    /// Open derivative positions relevant to `instrument`.
    fn positions(&self, instrument: &Instrument) -> Result<Vec<PositionSnapshot>, HostError>;

    /// Latest spot holdings across all currencies.
    fn holdings(&self) -> Result<Vec<HoldingSnapshot>, HostError>;
}
