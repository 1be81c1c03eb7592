// =============================================================================
// Signal Evaluator
// =============================================================================
//
// Direction rule:
//   Long    fast EMA > slow EMA  AND  RSI > midline  AND  MACD > signal
//   Short   fast EMA < slow EMA  AND  RSI < midline  AND  MACD < signal
//   Neutral otherwise, or when any of the three inputs is missing.
//
// Stops and targets follow `StopPolicy`.  A neutral signal carries neither.
// Levels that would land at or below zero (a short with a wide ATR, or a
// percentage of 100 or more) are dropped rather than reported.
// =============================================================================

use crate::indicators::IndicatorSnapshot;
use crate::runtime_config::{StopPolicy, StrategyParams};
use crate::types::Direction;

use super::commentary::build_commentary;
use super::Signal;

/// Evaluate the snapshot against the latest close.
pub fn evaluate(close: f64, snapshot: &IndicatorSnapshot, params: &StrategyParams) -> Signal {
    let direction = direction(snapshot, params.rsi_midline);
    let (stop_loss, take_profits) = levels(direction, close, snapshot.atr, &params.stop_policy);

    Signal {
        direction,
        entry_price: close,
        stop_loss,
        take_profits,
        commentary: build_commentary(close, snapshot, params),
    }
}

/// Aggregate direction from the EMA pair, RSI and MACD.
pub fn direction(snapshot: &IndicatorSnapshot, rsi_midline: f64) -> Direction {
    let (Some(ema), Some(rsi), Some(macd)) = (snapshot.ema, snapshot.rsi, snapshot.macd) else {
        return Direction::Neutral;
    };

    if ema.fast > ema.slow && rsi.value > rsi_midline && macd.macd > macd.signal {
        Direction::Long
    } else if ema.fast < ema.slow && rsi.value < rsi_midline && macd.macd < macd.signal {
        Direction::Short
    } else {
        Direction::Neutral
    }
}

/// Stop-loss and take-profit prices for `direction` around `entry`.
pub fn levels(
    direction: Direction,
    entry: f64,
    atr: Option<f64>,
    policy: &StopPolicy,
) -> (Option<f64>, Vec<f64>) {
    // +1 places targets above entry and the stop below; -1 mirrors.
    let side = match direction {
        Direction::Long => 1.0,
        Direction::Short => -1.0,
        Direction::Neutral => return (None, Vec::new()),
    };

    let (stop_distance, target_distances): (f64, Vec<f64>) = match policy {
        StopPolicy::Percentage {
            stop_pct,
            take_profit_pcts,
        } => (
            entry * stop_pct / 100.0,
            take_profit_pcts.iter().map(|p| entry * p / 100.0).collect(),
        ),
        StopPolicy::Atr {
            stop_multiplier,
            take_profit_multipliers,
            fallback_pct,
        } => match atr.filter(|a| a.is_finite() && *a > 0.0) {
            Some(atr) => (
                atr * stop_multiplier,
                take_profit_multipliers.iter().map(|m| atr * m).collect(),
            ),
            None => {
                // No ATR: the stop sits at `fallback_pct` and targets keep
                // their ratio to the stop multiplier.
                let unit = entry * fallback_pct / 100.0;
                let scale = if *stop_multiplier > 0.0 { unit / stop_multiplier } else { unit };
                (unit, take_profit_multipliers.iter().map(|m| scale * m).collect())
            }
        },
    };

    let stop_loss = Some(entry - side * stop_distance).filter(|p| is_price(*p));
    let take_profits = target_distances
        .into_iter()
        .map(|d| entry + side * d)
        .filter(|p| is_price(*p))
        .collect();
    (stop_loss, take_profits)
}

fn is_price(p: f64) -> bool {
    p.is_finite() && p > 0.0
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::macd::MacdValue;
    use crate::indicators::snapshot::{EmaPair, RsiValue};

    fn snapshot(fast: f64, slow: f64, rsi: f64, macd: f64, signal: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema: Some(EmaPair {
                fast_period: 9,
                slow_period: 21,
                fast,
                slow,
            }),
            rsi: Some(RsiValue { value: rsi, sma: None }),
            macd: Some(MacdValue {
                macd,
                signal,
                histogram: macd - signal,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn long_requires_all_three() {
        assert_eq!(direction(&snapshot(101.0, 100.0, 55.0, 1.0, 0.5), 50.0), Direction::Long);
        // Each condition failing on its own breaks the long.
        assert_eq!(direction(&snapshot(99.0, 100.0, 55.0, 1.0, 0.5), 50.0), Direction::Neutral);
        assert_eq!(direction(&snapshot(101.0, 100.0, 45.0, 1.0, 0.5), 50.0), Direction::Neutral);
        assert_eq!(direction(&snapshot(101.0, 100.0, 55.0, 0.4, 0.5), 50.0), Direction::Neutral);
    }

    #[test]
    fn short_is_symmetric() {
        assert_eq!(direction(&snapshot(99.0, 100.0, 45.0, -1.0, -0.5), 50.0), Direction::Short);
        assert_eq!(direction(&snapshot(99.0, 100.0, 55.0, -1.0, -0.5), 50.0), Direction::Neutral);
    }

    #[test]
    fn ties_are_neutral() {
        assert_eq!(direction(&snapshot(100.0, 100.0, 55.0, 1.0, 0.5), 50.0), Direction::Neutral);
        assert_eq!(direction(&snapshot(101.0, 100.0, 50.0, 1.0, 0.5), 50.0), Direction::Neutral);
        assert_eq!(direction(&snapshot(101.0, 100.0, 55.0, 0.5, 0.5), 50.0), Direction::Neutral);
    }

    #[test]
    fn missing_input_is_neutral() {
        let mut snap = snapshot(101.0, 100.0, 55.0, 1.0, 0.5);
        snap.macd = None;
        assert_eq!(direction(&snap, 50.0), Direction::Neutral);

        let mut snap = snapshot(101.0, 100.0, 55.0, 1.0, 0.5);
        snap.rsi = None;
        assert_eq!(direction(&snap, 50.0), Direction::Neutral);

        assert_eq!(direction(&IndicatorSnapshot::default(), 50.0), Direction::Neutral);
    }

    #[test]
    fn long_iff_all_conditions_grid() {
        for &fast in &[99.0, 100.0, 101.0] {
            for &rsi in &[45.0, 50.0, 55.0] {
                for &macd in &[-1.0, 0.0, 1.0] {
                    let snap = snapshot(fast, 100.0, rsi, macd, 0.0);
                    let expected_long = fast > 100.0 && rsi > 50.0 && macd > 0.0;
                    assert_eq!(
                        direction(&snap, 50.0) == Direction::Long,
                        expected_long,
                        "fast={fast} rsi={rsi} macd={macd}"
                    );
                }
            }
        }
    }

    #[test]
    fn percentage_levels() {
        let policy = StopPolicy::percentage();
        let (sl, tps) = levels(Direction::Long, 100.0, None, &policy);
        assert!((sl.unwrap() - 97.0).abs() < 1e-9);
        assert_eq!(tps.len(), 1);
        assert!((tps[0] - 103.0).abs() < 1e-9);

        let (sl, tps) = levels(Direction::Short, 100.0, None, &policy);
        assert!((sl.unwrap() - 103.0).abs() < 1e-9);
        assert!((tps[0] - 97.0).abs() < 1e-9);
    }

    #[test]
    fn atr_levels() {
        let policy = StopPolicy::atr();
        let (sl, tps) = levels(Direction::Long, 100.0, Some(2.0), &policy);
        assert!((sl.unwrap() - 97.0).abs() < 1e-9);
        assert!((tps[0] - 103.0).abs() < 1e-9);
        assert!((tps[1] - 106.0).abs() < 1e-9);

        let (sl, tps) = levels(Direction::Short, 100.0, Some(2.0), &policy);
        assert!((sl.unwrap() - 103.0).abs() < 1e-9);
        assert!((tps[1] - 94.0).abs() < 1e-9);
    }

    #[test]
    fn atr_policy_falls_back_without_atr() {
        let (sl, tps) = levels(Direction::Long, 200.0, None, &StopPolicy::atr());
        assert!((sl.unwrap() - 194.0).abs() < 1e-9);
        assert!((tps[0] - 206.0).abs() < 1e-9);
        assert!((tps[1] - 212.0).abs() < 1e-9);
    }

    #[test]
    fn short_with_wide_atr_drops_negative_targets() {
        // Targets 100 - 60 = 40 and 100 - 120 = -20; only the first survives.
        let (sl, tps) = levels(Direction::Short, 100.0, Some(40.0), &StopPolicy::atr());
        assert!((sl.unwrap() - 160.0).abs() < 1e-9);
        assert_eq!(tps.len(), 1);
        assert!((tps[0] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn full_percentage_stop_is_dropped() {
        let policy = StopPolicy::Percentage {
            stop_pct: 100.0,
            take_profit_pcts: vec![50.0, 150.0],
        };
        let (sl, tps) = levels(Direction::Long, 100.0, None, &policy);
        assert!(sl.is_none());
        assert_eq!(tps.len(), 2);

        let (sl, tps) = levels(Direction::Short, 100.0, None, &policy);
        assert!((sl.unwrap() - 200.0).abs() < 1e-9);
        assert_eq!(tps.len(), 1);
        assert!((tps[0] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn neutral_has_no_levels() {
        let (sl, tps) = levels(Direction::Neutral, 100.0, Some(1.0), &StopPolicy::atr());
        assert!(sl.is_none());
        assert!(tps.is_empty());
    }

    #[test]
    fn evaluate_sets_entry_and_levels() {
        let snap = snapshot(101.0, 100.0, 60.0, 1.0, 0.5);
        let signal = evaluate(250.0, &snap, &StrategyParams::default());
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.entry_price, 250.0);
        assert!(signal.stop_loss.unwrap() < 250.0);
        assert!(signal.take_profits.iter().all(|tp| *tp > 250.0));
        assert!(signal.is_actionable());
    }

    #[test]
    fn custom_midline() {
        let snap = snapshot(101.0, 100.0, 55.0, 1.0, 0.5);
        let params = StrategyParams {
            rsi_midline: 57.0,
            ..Default::default()
        };
        assert_eq!(evaluate(100.0, &snap, &params).direction, Direction::Neutral);
    }
}
