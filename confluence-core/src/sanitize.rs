//! Missing-data repair for price and volume series.
//!
//! A zero sample past the slow-EMA warmup is treated as a gap and replaced by
//! the previous (already repaired) value. A run of consecutive repairs as long
//! as the slow period would flatten every indicator, so it fails instead.

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::EvalError;

/// Forward-fill zero samples and convert to `f64`.
///
/// Indices `0..=slow_period` pass through untouched. The output has the same
/// length as `values`. Fails with [`EvalError::DataGapTooLong`] once the
/// current fill streak reaches `slow_period`.
pub fn forward_fill(
    values: &[Decimal],
    slow_period: usize,
    at: NaiveDateTime,
) -> Result<Vec<f64>, EvalError> {
    let mut out = Vec::with_capacity(values.len());
    let mut streak = 0usize;
    let mut last = Decimal::ZERO;

    for (i, &value) in values.iter().enumerate() {
        let repaired = if value.is_zero() && i > slow_period {
            streak += 1;
            last
        } else {
            streak = 0;
            value
        };

        if streak >= slow_period {
            return Err(EvalError::DataGapTooLong {
                streak,
                limit: slow_period,
                at,
            });
        }

        last = repaired;
        out.push(repaired.to_f64().unwrap_or(f64::NAN));
    }

    Ok(out)
}
