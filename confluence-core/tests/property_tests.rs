//! Property tests for evaluator invariants.
//!
//! Uses proptest to verify:
//! 1. Sanitizer identity: gap-free input only changes representation
//! 2. Gap boundary: a fill streak equal to the slow period is rejected
//! 3. Partial config updates: untouched settings keep their values
//! 4. Band-touch insufficiency: short history never counts as a touch
//! 5. Entry gate: Buy implies trend up and two flexible signals, and the
//!    tracker never changes the direction

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;

use confluence_core::pipeline::IndicatorSnapshot;
use confluence_core::sanitize::forward_fill;
use confluence_core::signal::{
    entry::entry_conditions, evaluate_entry, touched_lower_band, ConditionState,
    ConditionTracker,
};
use confluence_core::{Direction, EvalError, Setting, StrategyConfig};

fn at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_nonzero_decimal() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_snapshot() -> impl Strategy<Value = IndicatorSnapshot> {
    (
        (90.0..110.0_f64, 90.0..110.0_f64, 90.0..110.0_f64),
        (0.0..100.0_f64, 0.0..100.0_f64),
        (90.0..110.0_f64, -500.0..500.0_f64, any::<bool>()),
    )
        .prop_map(
            |((close, ema_fast, ema_slow), (rsi, rsi_prev), (bb_middle, obv_slope, touched))| {
                IndicatorSnapshot {
                    close,
                    ema_fast,
                    ema_slow,
                    rsi,
                    rsi_prev,
                    bb_middle,
                    obv_slope,
                    touched_lower: touched,
                }
            },
        )
}

// ── 1. Sanitizer identity ────────────────────────────────────────────

proptest! {
    #[test]
    fn gap_free_series_passes_through(
        values in prop::collection::vec(arb_nonzero_decimal(), 1..300),
        slow in 1usize..250,
    ) {
        let out = forward_fill(&values, slow, at()).unwrap();
        prop_assert_eq!(out.len(), values.len());
        for (o, v) in out.iter().zip(&values) {
            prop_assert_eq!(*o, v.to_f64().unwrap());
        }
    }
}

// ── 2. Gap boundary ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn streak_equal_to_slow_period_is_rejected(
        slow in 2usize..40,
        extra in 1usize..20,
        fill in arb_nonzero_decimal(),
    ) {
        let mut values = vec![fill; slow + extra];
        values.extend(std::iter::repeat(Decimal::ZERO).take(slow));

        let err = forward_fill(&values, slow, at()).unwrap_err();
        let is_gap_error = matches!(
            err,
            EvalError::DataGapTooLong { streak, limit, .. } if streak == slow && limit == slow
        );
        prop_assert!(is_gap_error);
    }

    #[test]
    fn streak_one_short_of_slow_period_is_repaired(
        slow in 2usize..40,
        extra in 1usize..20,
        fill in arb_nonzero_decimal(),
    ) {
        let mut values = vec![fill; slow + extra];
        values.extend(std::iter::repeat(Decimal::ZERO).take(slow - 1));

        let out = forward_fill(&values, slow, at()).unwrap();
        let expected = fill.to_f64().unwrap();
        prop_assert!(out.iter().all(|&v| v == expected));
    }
}

// ── 3. Partial config updates ────────────────────────────────────────

proptest! {
    #[test]
    fn partial_update_keeps_other_settings(
        chosen in prop::sample::subsequence(Setting::ALL.to_vec(), 0..=Setting::ALL.len()),
        value in 1.0..500.0_f64,
    ) {
        let before = StrategyConfig::default();
        let bag: BTreeMap<String, serde_json::Value> = chosen
            .iter()
            .map(|s| (s.key().to_string(), json!(value)))
            .collect();

        let mut after = before.clone();
        after.apply_settings(&bag).unwrap();

        for setting in Setting::ALL {
            if chosen.contains(&setting) {
                let got = after.get(setting);
                prop_assert!(got == value || got == value.trunc());
            } else {
                prop_assert_eq!(after.get(setting), before.get(setting));
            }
        }
    }

    #[test]
    fn rejected_update_changes_nothing(
        chosen in prop::sample::subsequence(Setting::ALL.to_vec(), 0..=Setting::ALL.len()),
        value in 1.0..500.0_f64,
    ) {
        let mut bag: BTreeMap<String, serde_json::Value> = chosen
            .iter()
            .map(|s| (s.key().to_string(), json!(value)))
            .collect();
        bag.insert("zz-not-a-setting".to_string(), json!(1.0));

        let mut config = StrategyConfig::default();
        prop_assert!(config.apply_settings(&bag).is_err());
        prop_assert_eq!(config, StrategyConfig::default());
    }
}

// ── 4. Band-touch insufficiency ──────────────────────────────────────

proptest! {
    #[test]
    fn short_history_never_touches(
        closes in prop::collection::vec(0.0..200.0_f64, 0..30),
        excess in 1usize..10,
    ) {
        // band far above every close: any scanned bar would touch
        let lower = vec![1_000.0; closes.len()];
        let lookback = closes.len() + excess;
        prop_assert!(!touched_lower_band(&closes, &lower, lookback));
    }
}

// ── 5. Entry gate ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn buy_requires_trend_and_two_signals(snap in arb_snapshot()) {
        let config = StrategyConfig::default();
        let mut tracker = ConditionTracker::new();
        let verdict = evaluate_entry(&config, &snap, &mut tracker);
        let state = entry_conditions(&config, &snap);

        let should_buy = state.trend_up && state.flexible_met >= 2;
        prop_assert_eq!(verdict.direction == Direction::Buy, should_buy);
        prop_assert_eq!(verdict.buy_limit.is_some(), should_buy);
        prop_assert_eq!(tracker.previous(), state);
    }

    #[test]
    fn tracker_history_never_changes_direction(
        snap in arb_snapshot(),
        earlier in arb_snapshot(),
    ) {
        let config = StrategyConfig::default();

        let mut fresh = ConditionTracker::new();
        let mut seasoned = ConditionTracker::new();
        evaluate_entry(&config, &earlier, &mut seasoned);

        let a = evaluate_entry(&config, &snap, &mut fresh);
        let b = evaluate_entry(&config, &snap, &mut seasoned);
        prop_assert_eq!(a.direction, b.direction);
        prop_assert_eq!(a.buy_limit, b.buy_limit);
        prop_assert_eq!(fresh.previous(), seasoned.previous());
    }

    #[test]
    fn flexible_count_matches_flags(snap in arb_snapshot()) {
        let ConditionState { momentum_ok, structure_ok, volume_ok, flexible_met, .. } =
            entry_conditions(&StrategyConfig::default(), &snap);
        let count = [momentum_ok, structure_ok, volume_ok].iter().filter(|b| **b).count();
        prop_assert_eq!(flexible_met as usize, count);
    }
}
