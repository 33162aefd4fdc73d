//! Error types for configuration, host queries and evaluation.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::Instrument;

/// Rejected named-settings update. Raised at configuration time only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown custom setting: {0}")]
    UnknownSetting(String),

    #[error("invalid {key} value: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    #[error("invalid {key} value {value}: {reason}")]
    OutOfRange {
        key: String,
        value: f64,
        reason: &'static str,
    },
}

/// Failure reported by a host data or position query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("no {what} available")]
    NoData { what: String },

    #[error("host query failed: {0}")]
    Query(String),
}

/// Failure of a single evaluation call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("no data handler supplied")]
    NilInput,

    #[error(
        "missing data exceeds minimum period length of {limit} at {} \
         and will distort results (streak {streak})",
        .at.format("%Y-%m-%d %H:%M:%S")
    )]
    DataGapTooLong {
        streak: usize,
        limit: usize,
        at: NaiveDateTime,
    },

    #[error(transparent)]
    Upstream(#[from] HostError),

    #[error("close series is empty")]
    EmptySeries,

    #[error("close and volume series are misaligned ({closes} closes, {volumes} volumes)")]
    SeriesMismatch { closes: usize, volumes: usize },

    #[error("negative volume at index {index}")]
    NegativeVolume { index: usize },

    #[error("instrument {0} appears more than once in the batch")]
    DuplicateInstrument(Instrument),
}

/// One failed member of a simultaneous batch.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{instrument} {error}")]
pub struct BatchFailure {
    pub instrument: Instrument,
    pub error: EvalError,
}
