//! Decision types and the entry/exit logic that produces them.
//!
//! Entry and exit evaluation are pure with respect to their verdict; the only
//! side effect is the caller-owned [`ConditionTracker`] that records transitions.

pub mod band_touch;
pub mod entry;
pub mod exit;
pub mod tracker;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Instrument;
use crate::host::LatestBar;

pub use band_touch::touched_lower_band;
pub use entry::evaluate_entry;
pub use exit::evaluate_exit;
pub use tracker::{ConditionState, ConditionTracker, Transition};

/// What the host should do with this instrument at this bar.
///
/// Holding an open position is reported as `DoNothing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
    DoNothing,
    MissingData,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::DoNothing => "DO NOTHING",
            Direction::MissingData => "MISSING DATA",
        };
        f.write_str(label)
    }
}

/// Outcome of entry or exit logic, before it is attached to a [`Decision`].
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub direction: Direction,
    pub buy_limit: Option<Decimal>,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            buy_limit: None,
            reasons: Vec::new(),
        }
    }
}

/// Decision for one instrument at one bar, with its reason trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub instrument: Instrument,
    pub time: NaiveDateTime,
    pub offset: usize,
    /// Close price reported by the host for the current bar.
    pub price: Decimal,
    pub direction: Direction,
    /// Suggested limit for a `Buy`; sizing and stops are left to the host.
    pub buy_limit: Option<Decimal>,
    pub reasons: Vec<String>,
}

impl Decision {
    pub fn new(instrument: Instrument, latest: &LatestBar) -> Self {
        Self {
            instrument,
            time: latest.time,
            offset: latest.offset,
            price: latest.close,
            direction: Direction::DoNothing,
            buy_limit: None,
            reasons: Vec::new(),
        }
    }

    pub fn append_reason(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Take over direction, limit and reasons from a verdict.
    pub fn apply(&mut self, verdict: Verdict) {
        self.direction = verdict.direction;
        self.buy_limit = verdict.buy_limit;
        self.reasons.extend(verdict.reasons);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn latest() -> LatestBar {
        LatestBar {
            offset: 250,
            time: NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            close: dec!(101.5),
        }
    }

    #[test]
    fn new_decision_defaults_to_do_nothing() {
        let d = Decision::new(Instrument::spot("kraken", "SOL-USD"), &latest());
        assert_eq!(d.direction, Direction::DoNothing);
        assert_eq!(d.price, dec!(101.5));
        assert_eq!(d.offset, 250);
        assert!(d.reasons.is_empty());
    }

    #[test]
    fn apply_appends_after_existing_reasons() {
        let mut d = Decision::new(Instrument::spot("kraken", "SOL-USD"), &latest());
        d.append_reason("first");
        let mut v = Verdict::new(Direction::Buy);
        v.buy_limit = Some(dec!(101.6));
        v.reasons.push("second".into());
        d.apply(v);
        assert_eq!(d.direction, Direction::Buy);
        assert_eq!(d.buy_limit, Some(dec!(101.6)));
        assert_eq!(d.reasons, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn decision_serialization_roundtrip() {
        let mut d = Decision::new(Instrument::derivative("kraken", "BTC-PERP"), &latest());
        d.append_reason("Holding position - no exit signals");
        let json = serde_json::to_string(&d).unwrap();
        let back: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
