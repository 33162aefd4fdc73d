//! Domain types shared by the signal engine and its host.

pub mod holding;
pub mod instrument;

pub use holding::{HoldingSnapshot, PositionSnapshot};
pub use instrument::{Instrument, InstrumentKind};
