use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset class of a tradable instrument.
///
/// Position lookup and the dust threshold both depend on the kind, so every
/// place that needs to distinguish them matches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Spot,
    Derivative,
}

impl InstrumentKind {
    /// Size at or below which a holding counts as flat.
    ///
    /// Spot compares base-currency holdings, derivatives compare position size.
    pub fn dust_threshold(self) -> Decimal {
        match self {
            InstrumentKind::Spot => dec!(0.01),
            InstrumentKind::Derivative => dec!(0.00001),
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Spot => f.write_str("spot"),
            InstrumentKind::Derivative => f.write_str("derivative"),
        }
    }
}

/// An instrument on a given exchange: the key for position lookup and for
/// per-instrument condition tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub exchange: String,
    pub symbol: String,
    pub kind: InstrumentKind,
}

impl Instrument {
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        kind: InstrumentKind,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            kind,
        }
    }

    pub fn spot(exchange: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::new(exchange, symbol, InstrumentKind::Spot)
    }

    pub fn derivative(exchange: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::new(exchange, symbol, InstrumentKind::Derivative)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.exchange, self.kind, self.symbol)
    }
}
