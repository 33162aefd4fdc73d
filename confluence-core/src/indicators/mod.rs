//! Indicator math over plain `f64` series.
//!
//! Every indicator returns a series of the same length as its input with
//! `f64::NAN` in the warmup region. The pipeline recomputes everything from
//! the full history on every evaluation; nothing here carries state.

pub mod bollinger;
pub mod ema;
pub mod obv;
pub mod rsi;

pub use bollinger::{bollinger_bands, BollingerBands};
pub use ema::{ema_of_series, Ema};
pub use obv::on_balance_volume;
pub use rsi::Rsi;

/// Single-input indicator.
///
/// No output value at index t may depend on input at t+1 or later.
pub trait Indicator: Send + Sync {
    /// Compute the indicator for the whole series.
    fn compute(&self, values: &[f64]) -> Vec<f64>;
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
