//! Condition-change tracking.
//!
//! Remembers the condition states from the previous entry evaluation of one
//! instrument and reports what changed. Purely observational: nothing here
//! feeds back into the decision.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean entry conditions plus the count of flexible signals met.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionState {
    pub trend_up: bool,
    pub momentum_ok: bool,
    pub structure_ok: bool,
    pub volume_ok: bool,
    /// Flexible signals met, 0..=3.
    pub flexible_met: u8,
}

/// A change in one condition between consecutive entry evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Trend(bool),
    Momentum(bool),
    Structure(bool),
    Volume(bool),
    Conditions { from: u8, to: u8 },
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Transition::Trend(true) => f.write_str("TREND_ON"),
            Transition::Trend(false) => f.write_str("TREND_OFF"),
            Transition::Momentum(true) => f.write_str("MOMENTUM_POSITIVE"),
            Transition::Momentum(false) => f.write_str("MOMENTUM_NEGATIVE"),
            Transition::Structure(true) => f.write_str("STRUCTURE_VALID"),
            Transition::Structure(false) => f.write_str("STRUCTURE_INVALID"),
            Transition::Volume(true) => f.write_str("VOLUME_POSITIVE"),
            Transition::Volume(false) => f.write_str("VOLUME_NEGATIVE"),
            Transition::Conditions { from, to } if to > from => {
                write!(f, "CONDITIONS_IMPROVED[{from}->{to}]")
            }
            Transition::Conditions { from, to } => write!(f, "CONDITIONS_DEGRADED[{from}->{to}]"),
        }
    }
}

/// Per-instrument memory of the last observed [`ConditionState`].
///
/// Starts zero-valued and is only reset by constructing a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionTracker {
    previous: ConditionState,
    observations: u64,
}

impl ConditionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// State stored by the last `observe` call.
    pub fn previous(&self) -> ConditionState {
        self.previous
    }

    /// Number of entry evaluations seen.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Compare `current` with the stored state, store it, and return the
    /// changes in field order: trend, momentum, structure, volume, count.
    pub fn observe(&mut self, current: ConditionState) -> Vec<Transition> {
        let prev = self.previous;
        let mut changes = Vec::new();

        if current.trend_up != prev.trend_up {
            changes.push(Transition::Trend(current.trend_up));
        }
        if current.momentum_ok != prev.momentum_ok {
            changes.push(Transition::Momentum(current.momentum_ok));
        }
        if current.structure_ok != prev.structure_ok {
            changes.push(Transition::Structure(current.structure_ok));
        }
        if current.volume_ok != prev.volume_ok {
            changes.push(Transition::Volume(current.volume_ok));
        }
        if current.flexible_met != prev.flexible_met {
            changes.push(Transition::Conditions {
                from: prev.flexible_met,
                to: current.flexible_met,
            });
        }

        self.previous = current;
        self.observations += 1;
        changes
    }
}
