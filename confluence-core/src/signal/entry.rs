//! Entry logic: mandatory trend gate plus at least two of three flexible signals.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::StrategyConfig;
use crate::pipeline::IndicatorSnapshot;

use super::tracker::{ConditionState, ConditionTracker, Transition};
use super::{Direction, Verdict};

/// Flexible signals required alongside the trend gate.
pub const MIN_FLEXIBLE_SIGNALS: u8 = 2;

/// Premium over the close for the suggested buy limit.
const BUY_LIMIT_FACTOR: Decimal = dec!(1.001);

/// Fraction of the band multiplier tolerated below the middle band.
const MIDDLE_BAND_TOLERANCE: f64 = 0.25;

/// Evaluate the entry conditions without touching any tracker.
pub fn entry_conditions(config: &StrategyConfig, snap: &IndicatorSnapshot) -> ConditionState {
    let trend_up = snap.ema_fast > snap.ema_slow;
    let momentum_ok = snap.rsi > 50.0 || snap.rsi > snap.rsi_prev;
    let tolerance = config.bb_std_dev * MIDDLE_BAND_TOLERANCE;
    let structure_ok = snap.touched_lower && snap.close >= snap.bb_middle - tolerance;
    let volume_ok = snap.obv_slope > 0.0;

    let flexible_met = [momentum_ok, structure_ok, volume_ok]
        .into_iter()
        .filter(|&ok| ok)
        .count() as u8;

    ConditionState {
        trend_up,
        momentum_ok,
        structure_ok,
        volume_ok,
        flexible_met,
    }
}

/// Decide Buy vs DoNothing for a flat instrument.
///
/// `tracker` is updated with the new condition states and any transitions
/// are reported in the reasons; it has no influence on the direction.
pub fn evaluate_entry(
    config: &StrategyConfig,
    snap: &IndicatorSnapshot,
    tracker: &mut ConditionTracker,
) -> Verdict {
    let state = entry_conditions(config, snap);
    let fast = config.ema_fast_period;
    let slow = config.ema_slow_period;

    let mut met = Vec::new();
    let mut not_met = Vec::new();

    if state.trend_up {
        met.push(format!("TREND✓(EMA{fast}>EMA{slow})"));
    } else {
        not_met.push(format!("TREND✗(EMA{fast}<EMA{slow})"));
    }

    if state.momentum_ok {
        met.push(format!("MOMENTUM✓(RSI:{:.1})", snap.rsi));
    } else {
        not_met.push(format!("MOMENTUM✗(RSI:{:.1})", snap.rsi));
    }

    if state.structure_ok {
        met.push("STRUCTURE✓(touched_lower+tolerance)".to_string());
    } else if snap.touched_lower {
        not_met.push(format!("STRUCTURE✗(touched✓,price<tolerance:{:.0})", snap.close));
    } else {
        not_met.push("STRUCTURE✗(no_lower_touch)".to_string());
    }

    if state.volume_ok {
        met.push(format!("VOLUME✓(OBV_slope:{:.1})", snap.obv_slope));
    } else {
        not_met.push(format!("VOLUME✗(OBV_slope:{:.1})", snap.obv_slope));
    }

    let mut verdict = Verdict::new(Direction::DoNothing);
    verdict.reasons.push(format!(
        "GATE[Trend:{}] SIGNALS[{}/3]: MET[{}] NOT_MET[{}]",
        state.trend_up,
        state.flexible_met,
        met.join(", "),
        not_met.join(", ")
    ));

    let changes = tracker.observe(state);
    if !changes.is_empty() {
        let labels: Vec<String> = changes.iter().map(Transition::to_string).collect();
        verdict
            .reasons
            .push(format!("STATE_CHANGES: {}", labels.join(", ")));
    }

    if state.trend_up && state.flexible_met >= MIN_FLEXIBLE_SIGNALS {
        verdict.direction = Direction::Buy;
        verdict.buy_limit = Decimal::from_f64(snap.close).map(|close| close * BUY_LIMIT_FACTOR);
        verdict.reasons.push(format!(
            "ENTRY SIGNAL: Trend gate passed + {}/3 signals met",
            state.flexible_met
        ));
    } else if !state.trend_up {
        verdict
            .reasons
            .push(format!("No entry: Trend gate failed (need EMA{fast}>EMA{slow})"));
    } else {
        verdict.reasons.push(format!(
            "No entry: Only {}/3 signals met (need {MIN_FLEXIBLE_SIGNALS}+)",
            state.flexible_met
        ));
    }

    verdict
}
