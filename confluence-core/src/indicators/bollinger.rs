//! Bollinger Bands: SMA middle band +/- a multiple of the rolling standard deviation.
//!
//! - Middle: SMA(x, period)
//! - Upper: middle + mult * stddev(x, period)
//! - Lower: middle - mult * stddev(x, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

/// All three bands, index-aligned with the input.
#[derive(Debug, Clone, Default)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Compute all three bands in one pass over the input.
pub fn bollinger_bands(values: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let n = values.len();
    let mut bands = BollingerBands {
        upper: vec![f64::NAN; n],
        middle: vec![f64::NAN; n],
        lower: vec![f64::NAN; n],
    };

    if period == 0 || n < period {
        return bands;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }

        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        bands.middle[i] = mean;
        bands.upper[i] = mean + multiplier * stddev;
        bands.lower[i] = mean - multiplier * stddev;
    }

    bands
}
