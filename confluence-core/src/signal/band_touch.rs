//! Lower Bollinger band touch detection.

/// Whether any close in the last `lookback` bars, excluding the current bar,
/// was at or below the lower band.
///
/// Returns `false` when either series is shorter than `lookback`: too little
/// history never counts as a touch.
pub fn touched_lower_band(closes: &[f64], lower: &[f64], lookback: usize) -> bool {
    if closes.len() < lookback || lower.len() < lookback {
        return false;
    }

    let start = closes.len() - lookback;
    let end = closes.len().saturating_sub(1);
    (start..end)
        .filter(|&i| i < lower.len())
        .any(|i| closes[i] <= lower[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOSES: [f64; 7] = [100.0, 99.0, 98.0, 95.0, 97.0, 100.0, 102.0];
    const LOWER: [f64; 7] = [96.0; 7];

    #[test]
    fn lookback_longer_than_history_is_no_touch() {
        assert!(!touched_lower_band(&CLOSES, &LOWER, 10));
    }

    #[test]
    fn touch_inside_window() {
        assert!(touched_lower_band(&CLOSES, &LOWER, 5));
    }

    #[test]
    fn no_touch_when_closes_stay_above() {
        let closes = [100.0, 99.0, 98.0, 97.0, 98.0, 100.0, 102.0];
        assert!(!touched_lower_band(&closes, &LOWER, 5));
    }

    #[test]
    fn current_bar_is_excluded() {
        let closes = [100.0, 100.0, 100.0, 90.0];
        assert!(!touched_lower_band(&closes, &[96.0; 4], 3));
    }

    #[test]
    fn touch_outside_window_is_ignored() {
        // 95 at index 3 falls before the last 3 bars
        assert!(!touched_lower_band(&CLOSES, &LOWER, 3));
    }

    #[test]
    fn equal_to_band_counts() {
        let closes = [100.0, 96.0, 100.0];
        assert!(touched_lower_band(&closes, &[96.0; 3], 3));
    }

    #[test]
    fn nan_band_never_touches() {
        let closes = [100.0, 50.0, 100.0];
        assert!(!touched_lower_band(&closes, &[f64::NAN; 3], 3));
    }
}
