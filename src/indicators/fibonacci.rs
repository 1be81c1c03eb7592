// =============================================================================
// Fibonacci Retracement
// =============================================================================
//
// Levels are measured down from the window's highest high towards its lowest
// low:  level(r) = high - (high - low) * r  for r in RATIOS.

use serde::{Deserialize, Serialize};

use crate::market_data::Candle;

/// Retracement ratios, 0 % (the high) through 100 % (the low).
pub const RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// A single retracement level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Retracement levels over a price range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevels {
    pub high: f64,
    pub low: f64,
    pub levels: Vec<FibLevel>,
}

impl FibonacciLevels {
    /// The level closest to `price`.
    pub fn nearest(&self, price: f64) -> Option<FibLevel> {
        self.levels
            .iter()
            .copied()
            .min_by(|a, b| (a.price - price).abs().total_cmp(&(b.price - price).abs()))
    }

    /// Closest level strictly below `price` (support) and strictly above it
    /// (resistance).
    pub fn bracket(&self, price: f64) -> (Option<FibLevel>, Option<FibLevel>) {
        let support = self
            .levels
            .iter()
            .copied()
            .filter(|l| l.price < price)
            .max_by(|a, b| a.price.total_cmp(&b.price));
        let resistance = self
            .levels
            .iter()
            .copied()
            .filter(|l| l.price > price)
            .min_by(|a, b| a.price.total_cmp(&b.price));
        (support, resistance)
    }
}

/// Compute retracement levels over the trailing `lookback` candles (the whole
/// slice when `lookback` is zero or longer than the slice).
///
/// Returns `None` for an empty window or when high == low.
pub fn calculate_fibonacci(candles: &[Candle], lookback: usize) -> Option<FibonacciLevels> {
    let start = if lookback == 0 {
        0
    } else {
        candles.len().saturating_sub(lookback)
    };
    let window = &candles[start..];
    if window.is_empty() {
        return None;
    }

    let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let range = high - low;
    if !range.is_finite() || range <= 0.0 {
        return None;
    }

    let levels = RATIOS
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: high - range * ratio,
        })
        .collect();

    Some(FibonacciLevels { high, low, levels })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64) -> Candle {
        Candle::new(0, low, high, low, (high + low) / 2.0, 1.0)
    }

    #[test]
    fn levels_span_range() {
        let candles = vec![candle(120.0, 100.0), candle(200.0, 150.0), candle(180.0, 110.0)];
        let fib = calculate_fibonacci(&candles, 0).unwrap();
        assert_eq!(fib.high, 200.0);
        assert_eq!(fib.low, 100.0);
        assert_eq!(fib.levels.len(), 7);
        assert_eq!(fib.levels[0].price, 200.0);
        assert!((fib.levels[3].price - 150.0).abs() < 1e-12);
        assert!((fib.levels[4].price - 138.2).abs() < 1e-9);
        assert_eq!(fib.levels[6].price, 100.0);
    }

    #[test]
    fn lookback_limits_window() {
        let candles = vec![candle(500.0, 10.0), candle(120.0, 100.0), candle(130.0, 105.0)];
        let fib = calculate_fibonacci(&candles, 2).unwrap();
        assert_eq!(fib.high, 130.0);
        assert_eq!(fib.low, 100.0);
    }

    #[test]
    fn degenerate_range() {
        assert!(calculate_fibonacci(&[], 0).is_none());
        assert!(calculate_fibonacci(&[candle(5.0, 5.0)], 0).is_none());
    }

    #[test]
    fn nearest_and_bracket() {
        let fib = calculate_fibonacci(&[candle(200.0, 100.0)], 0).unwrap();
        let nearest = fib.nearest(152.0).unwrap();
        assert_eq!(nearest.ratio, 0.5);

        let (support, resistance) = fib.bracket(155.0);
        assert_eq!(support.unwrap().ratio, 0.5);
        assert_eq!(resistance.unwrap().ratio, 0.382);

        let (support, resistance) = fib.bracket(250.0);
        assert_eq!(support.unwrap().ratio, 0.0);
        assert!(resistance.is_none());
    }
}
