//! Paper position book: remembers what the replay bought.
//!
//! Not a portfolio. There is no cash, no fill price and no PnL; the book only
//! tells the evaluator whether each instrument is currently held.

use confluence_core::{
    Decision, Direction, HoldingSnapshot, HostError, Instrument, InstrumentKind, PositionBook,
    PositionSnapshot,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PaperBook {
    sizes: HashMap<Instrument, Decimal>,
}

impl PaperBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, instrument: Instrument, size: Decimal) {
        if size.is_zero() {
            self.sizes.remove(&instrument);
        } else {
            self.sizes.insert(instrument, size);
        }
    }

    pub fn clear(&mut self, instrument: &Instrument) {
        self.sizes.remove(instrument);
    }

    pub fn size(&self, instrument: &Instrument) -> Decimal {
        self.sizes.get(instrument).copied().unwrap_or_default()
    }

    /// Record the effect of a decision: Buy opens `position_size`, Sell
    /// closes, anything else leaves the book alone.
    pub fn apply(&mut self, decision: &Decision, position_size: Decimal) {
        match decision.direction {
            Direction::Buy => self.set(decision.instrument.clone(), position_size),
            Direction::Sell => self.clear(&decision.instrument),
            Direction::DoNothing | Direction::MissingData => {}
        }
    }
}

impl PositionBook for PaperBook {
    fn positions(&self, instrument: &Instrument) -> Result<Vec<PositionSnapshot>, HostError> {
        Ok(self
            .sizes
            .get_key_value(instrument)
            .filter(|(i, _)| i.kind == InstrumentKind::Derivative)
            .map(|(i, size)| PositionSnapshot {
                instrument: i.clone(),
                latest_size: *size,
            })
            .into_iter()
            .collect())
    }

    fn holdings(&self) -> Result<Vec<HoldingSnapshot>, HostError> {
        Ok(self
            .sizes
            .iter()
            .filter(|(i, _)| i.kind == InstrumentKind::Spot)
            .map(|(i, size)| HoldingSnapshot {
                instrument: i.clone(),
                base_size: *size,
            })
            .collect())
    }
}
