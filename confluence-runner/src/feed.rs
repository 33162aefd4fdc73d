//! In-memory market data: CSV and synthetic bar series behind a cursor.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use confluence_core::{HostError, Instrument, LatestBar, MarketData};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{}: line {line}: unparseable timestamp {value:?}", .path.display())]
    BadTimestamp {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{}: line {line}: invalid {field} {value:?}", .path.display())]
    BadNumber {
        path: PathBuf,
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("{}: line {line}: timestamp not after the previous row", .path.display())]
    OutOfOrder { path: PathBuf, line: u64 },

    #[error("{} contains no bars", .path.display())]
    Empty { path: PathBuf },
}

/// One bar: the only fields the evaluator reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRow {
    pub timestamp: NaiveDateTime,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    timestamp: String,
    close: String,
    volume: String,
}

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Read a `timestamp,close,volume` CSV with a header row.
///
/// Rows must be strictly chronological. A zero close is kept as-is: it marks
/// a gap the evaluator repairs or reports.
pub fn load_csv(path: &Path) -> Result<Vec<BarRow>, FeedError> {
    let csv_err = |source: csv::Error| FeedError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows: Vec<BarRow> = Vec::new();
    for record in reader.deserialize::<RawRow>() {
        let raw = record.map_err(csv_err)?;
        // header is line 1
        let line = rows.len() as u64 + 2;

        let timestamp = parse_timestamp(&raw.timestamp).ok_or_else(|| FeedError::BadTimestamp {
            path: path.to_path_buf(),
            line,
            value: raw.timestamp.clone(),
        })?;
        let number = |field: &'static str, value: &str| {
            Decimal::from_str(value.trim()).map_err(|_| FeedError::BadNumber {
                path: path.to_path_buf(),
                line,
                field,
                value: value.to_string(),
            })
        };
        let close = number("close", &raw.close)?;
        let volume = number("volume", &raw.volume)?;

        if rows.last().is_some_and(|prev| prev.timestamp >= timestamp) {
            return Err(FeedError::OutOfOrder {
                path: path.to_path_buf(),
                line,
            });
        }
        rows.push(BarRow {
            timestamp,
            close,
            volume,
        });
    }

    if rows.is_empty() {
        return Err(FeedError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(rows)
}

/// Generate a deterministic daily random walk starting at 100.
///
/// The same `(symbol, seed)` always yields the same series.
pub fn synthetic_series(symbol: &str, bars: usize, seed: u64) -> Vec<BarRow> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed_bytes = blake3::hash(format!("{symbol}:{seed}").as_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let mut price = 100.0_f64;

    (0..bars)
        .map(|i| {
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            price *= 1.0 + daily_return;
            let volume: u64 = rng.gen_range(500_000..5_000_000);
            BarRow {
                timestamp: start + Duration::days(i as i64),
                close: Decimal::from_f64(price).unwrap_or_default().round_dp(4),
                volume: Decimal::from(volume),
            }
        })
        .collect()
}

/// Market data for one instrument with a replay cursor.
///
/// Only the first `cursor` rows are visible; nothing past the cursor leaks
/// into any query.
#[derive(Debug, Clone)]
pub struct SeriesFeed {
    instrument: Instrument,
    rows: Vec<BarRow>,
    cursor: usize,
}

impl SeriesFeed {
    /// A feed with nothing visible yet. `rows` must be chronological.
    pub fn new(instrument: Instrument, rows: Vec<BarRow>) -> Self {
        Self {
            instrument,
            rows,
            cursor: 0,
        }
    }

    /// A feed with every row visible.
    pub fn fully_visible(instrument: Instrument, rows: Vec<BarRow>) -> Self {
        let cursor = rows.len();
        Self {
            instrument,
            rows,
            cursor,
        }
    }

    /// Reveal one more bar. Returns false once every row is visible.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.rows.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn visible(&self) -> &[BarRow] {
        &self.rows[..self.cursor]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl MarketData for SeriesFeed {
    fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    fn latest(&self) -> Result<LatestBar, HostError> {
        let row = self.visible().last().ok_or_else(|| HostError::NoData {
            what: format!("bars for {}", self.instrument),
        })?;
        Ok(LatestBar {
            offset: self.cursor,
            time: row.timestamp,
            close: row.close,
        })
    }

    fn stream_close(&self) -> Result<Vec<Decimal>, HostError> {
        Ok(self.visible().iter().map(|r| r.close).collect())
    }

    fn stream_volume(&self) -> Result<Vec<Decimal>, HostError> {
        Ok(self.visible().iter().map(|r| r.volume).collect())
    }

    fn has_data_at(&self, time: NaiveDateTime) -> Result<bool, HostError> {
        let visible = self.visible();
        Ok(visible
            .binary_search_by_key(&time, |r| r.timestamp)
            .is_ok_and(|i| !visible[i].close.is_zero()))
    }
}
