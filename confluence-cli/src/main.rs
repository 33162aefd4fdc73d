//! Confluence CLI: evaluate a bar, replay a run config, inspect settings.
//!
//! Commands:
//! - `evaluate`: evaluate the latest bar of a CSV series and print the decision
//! - `replay`: replay a TOML run config bar by bar and emit a JSON report
//! - `settings`: print the effective named settings and their fingerprint

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use confluence_core::{Instrument, InstrumentKind, Strategy, StrategyConfig};
use confluence_runner::{load_csv, replay, PaperBook, RunConfig, SeriesFeed};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Confluence CLI: multi-indicator trading signal evaluator"
)]
struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the latest bar of a `timestamp,close,volume` CSV.
    Evaluate {
        /// Path to the CSV file.
        #[arg(long)]
        csv: PathBuf,

        /// Instrument symbol (e.g., SOL-USD).
        #[arg(long)]
        symbol: String,

        /// Exchange name used to key the instrument.
        #[arg(long, default_value = "local")]
        exchange: String,

        #[arg(long, value_enum, default_value_t = KindArg::Spot)]
        kind: KindArg,

        /// Currently held size; omitted means flat.
        #[arg(long)]
        holding: Option<Decimal>,

        /// Strategy setting override, `key=value`. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        settings: Vec<String>,
    },
    /// Replay a TOML run config and write the JSON report.
    Replay {
        /// Path to the run config.
        #[arg(long)]
        config: PathBuf,

        /// Report destination. Printed to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective strategy settings.
    Settings {
        /// Strategy setting override, `key=value`. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        settings: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Spot,
    Derivative,
}

impl From<KindArg> for InstrumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Spot => InstrumentKind::Spot,
            KindArg::Derivative => InstrumentKind::Derivative,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    match cli.command {
        Commands::Evaluate {
            csv,
            symbol,
            exchange,
            kind,
            holding,
            settings,
        } => run_evaluate(csv, symbol, exchange, kind, holding, &settings),
        Commands::Replay { config, output } => run_replay(config, output),
        Commands::Settings { settings } => run_settings(&settings),
    }
}

/// Logs go to stderr; stdout carries decisions and reports.
fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Parse repeated `key=value` overrides into a named-settings bag.
///
/// Values that parse as JSON keep their type so the strategy can reject
/// non-numeric ones with a typed error; anything else is passed as a string.
fn parse_settings(pairs: &[String]) -> Result<BTreeMap<String, Value>> {
    let mut bag = BTreeMap::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("setting {pair:?} is not of the form key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("setting {pair:?} has an empty key");
        }
        let raw = raw.trim();
        let value = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        bag.insert(key.to_string(), value);
    }
    Ok(bag)
}

fn run_evaluate(
    csv: PathBuf,
    symbol: String,
    exchange: String,
    kind: KindArg,
    holding: Option<Decimal>,
    settings: &[String],
) -> Result<()> {
    let bag = parse_settings(settings)?;
    let mut strategy = Strategy::with_settings(&bag)?;

    let instrument = Instrument::new(exchange, symbol, kind.into());
    let rows = load_csv(&csv)?;
    let feed = SeriesFeed::fully_visible(instrument.clone(), rows);

    let mut book = PaperBook::new();
    if let Some(size) = holding {
        book.set(instrument.clone(), size);
    }

    let decision = strategy
        .on_signal(Some(&feed), &book)
        .with_context(|| format!("evaluating {instrument}"))?;
    info!(instrument = %instrument, direction = %decision.direction, "evaluated");

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn run_replay(config_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let config = RunConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let report = replay(&config)?;
    let json = report.to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            for summary in &report.instruments {
                println!(
                    "{}: {} bars, {} buys, {} sells, {} missing, {} failures",
                    summary.instrument,
                    summary.bars,
                    summary.buys,
                    summary.sells,
                    summary.missing,
                    summary.failures
                );
            }
            println!("Report saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_settings(settings: &[String]) -> Result<()> {
    let config = StrategyConfig::from_settings(&parse_settings(settings)?)?;
    for (key, value) in config.settings() {
        println!("{key} = {value}");
    }
    println!("# fingerprint {}", config.fingerprint());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_pairs_keep_json_types() {
        let bag = parse_settings(&[
            "ema-fast-period=20".to_string(),
            "bb-std-dev = 2.5".to_string(),
            "rsi-period=fast".to_string(),
        ])
        .unwrap();
        assert_eq!(bag["ema-fast-period"], json!(20));
        assert_eq!(bag["bb-std-dev"], json!(2.5));
        assert_eq!(bag["rsi-period"], json!("fast"));
    }

    #[test]
    fn malformed_pair_rejected() {
        assert!(parse_settings(&["ema-fast-period".to_string()]).is_err());
        assert!(parse_settings(&["=5".to_string()]).is_err());
    }

    #[test]
    fn string_setting_fails_at_strategy_boundary() {
        let bag = parse_settings(&["rsi-period=fast".to_string()]).unwrap();
        let err = Strategy::with_settings(&bag).unwrap_err();
        assert_eq!(err.to_string(), "invalid rsi-period value: expected number");
    }

    #[test]
    fn evaluate_args_parse() {
        let cli = Cli::try_parse_from([
            "confluence",
            "evaluate",
            "--csv",
            "sol.csv",
            "--symbol",
            "SOL-PERP",
            "--kind",
            "derivative",
            "--holding",
            "0.5",
            "--set",
            "lookback-periods=12",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                kind,
                holding,
                settings,
                ..
            } => {
                assert_eq!(kind, KindArg::Derivative);
                assert_eq!(holding, Some(Decimal::new(5, 1)));
                assert_eq!(settings, vec!["lookback-periods=12".to_string()]);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["confluence", "settings", "--json"]).unwrap();
        assert!(cli.json);
    }
}
