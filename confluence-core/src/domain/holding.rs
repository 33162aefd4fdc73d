use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Instrument;

/// Latest size of a derivative position as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub instrument: Instrument,
    pub latest_size: Decimal,
}

/// Latest spot holding as reported by the host, in base-currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    pub instrument: Instrument,
    pub base_size: Decimal,
}

impl PositionSnapshot {
    /// True when the position exceeds the derivative dust threshold.
    pub fn is_meaningful(&self) -> bool {
        self.latest_size > self.instrument.kind.dust_threshold()
    }
}

impl HoldingSnapshot {
    /// True when the holding exceeds the spot dust threshold.
    pub fn is_meaningful(&self) -> bool {
        self.base_size > self.instrument.kind.dust_threshold()
    }
}
