//! Confluence Runner: replay harness for the multi-indicator evaluator.
//!
//! This crate plays the host:
//! - TOML run configuration
//! - CSV and synthetic bar feeds implementing `MarketData`
//! - A paper position book implementing `PositionBook`
//! - A bar-by-bar replay driver and its JSON report

pub mod book;
pub mod config;
pub mod feed;
pub mod replay;

pub use book::PaperBook;
pub use config::{InstrumentConfig, ReplaySettings, RunConfig, RunConfigError, SourceConfig};
pub use feed::{load_csv, synthetic_series, BarRow, FeedError, SeriesFeed};
pub use replay::{replay, replay_feeds, FailureRecord, InstrumentSummary, ReplayError, ReplayReport};
