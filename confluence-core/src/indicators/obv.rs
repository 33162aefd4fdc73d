//! On-Balance Volume (OBV).
//!
//! OBV[0] = volume[0]; afterwards volume is added on an up close, subtracted
//! on a down close and ignored on an unchanged close. Only differences of OBV
//! are consumed downstream, so the seed only shifts the level.

/// Compute OBV from index-aligned close and volume series.
///
/// The output has the length of the shorter input.
pub fn on_balance_volume(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let n = closes.len().min(volumes.len());
    let mut result = Vec::with_capacity(n);
    if n == 0 {
        return result;
    }

    let mut running = volumes[0];
    result.push(running);
    for i in 1..n {
        if closes[i] > closes[i - 1] {
            running += volumes[i];
        } else if closes[i] < closes[i - 1] {
            running -= volumes[i];
        }
        result.push(running);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn obv_signed_running_total() {
        let closes = [10.0, 11.0, 10.5, 10.5, 12.0];
        let volumes = [100.0, 200.0, 50.0, 80.0, 300.0];
        let obv = on_balance_volume(&closes, &volumes);
        let expected = [100.0, 300.0, 250.0, 250.0, 550.0];
        for (got, want) in obv.iter().zip(expected) {
            assert_approx(*got, want, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn obv_empty_input() {
        assert!(on_balance_volume(&[], &[]).is_empty());
    }

    #[test]
    fn obv_truncates_to_shorter_input() {
        assert_eq!(on_balance_volume(&[1.0, 2.0, 3.0], &[5.0, 5.0]).len(), 2);
    }
}
