//! Exit logic: RSI overbought reversal or close below the middle band.

use crate::config::StrategyConfig;
use crate::pipeline::IndicatorSnapshot;

use super::{Direction, Verdict};

/// Decide Sell vs hold for an open position. Either condition alone exits.
pub fn evaluate_exit(config: &StrategyConfig, snap: &IndicatorSnapshot) -> Verdict {
    let overbought_reversal =
        snap.rsi_prev >= config.rsi_exit_overbought && snap.rsi < snap.rsi_prev;
    let structure_breakdown = snap.close < snap.bb_middle;

    if !(overbought_reversal || structure_breakdown) {
        let mut verdict = Verdict::new(Direction::DoNothing);
        verdict
            .reasons
            .push("Holding position - no exit signals".to_string());
        return verdict;
    }

    let mut verdict = Verdict::new(Direction::Sell);
    if overbought_reversal {
        verdict.reasons.push(format!(
            "Exit: RSI overbought reversal ({:.2}->{:.2})",
            snap.rsi_prev, snap.rsi
        ));
    }
    if structure_breakdown {
        verdict.reasons.push(format!(
            "Exit: Close below BB middle ({:.2} < {:.2})",
            snap.close, snap.bb_middle
        ));
    }
    verdict
}
