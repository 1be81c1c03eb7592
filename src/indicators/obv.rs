// =============================================================================
// On-Balance Volume (OBV)
// =============================================================================
//
// Running total of volume signed by the close-to-close direction:
//   close_t > close_{t-1}  => OBV += volume_t
//   close_t < close_{t-1}  => OBV -= volume_t
//   otherwise              => unchanged
//
// The series starts at 0 on the first candle.

use crate::market_data::Candle;

/// Compute the OBV series, one value per candle.
pub fn calculate_obv(candles: &[Candle]) -> Vec<f64> {
    let Some(first) = candles.first() else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(candles.len());
    let mut obv = 0.0;
    let mut prev_close = first.close;
    result.push(obv);

    for c in &candles[1..] {
        if c.close > prev_close {
            obv += c.volume;
        } else if c.close < prev_close {
            obv -= c.volume;
        }
        result.push(obv);
        prev_close = c.close;
    }

    result
}

/// Latest OBV value and its change over the last `lookback` bars.
///
/// The change is `None` when the series is not longer than `lookback`.
pub fn obv_with_change(candles: &[Candle], lookback: usize) -> Option<(f64, Option<f64>)> {
    let series = calculate_obv(candles);
    let last = *series.last()?;
    let change = (lookback > 0 && series.len() > lookback)
        .then(|| last - series[series.len() - 1 - lookback]);
    Some((last, change))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64, volume: f64) -> Candle {
        Candle::new(0, close, close, close, close, volume)
    }

    #[test]
    fn obv_empty() {
        assert!(calculate_obv(&[]).is_empty());
        assert!(obv_with_change(&[], 5).is_none());
    }

    #[test]
    fn obv_signs_follow_close() {
        let candles = vec![
            candle(10.0, 100.0),
            candle(11.0, 50.0),
            candle(11.0, 70.0),
            candle(9.0, 30.0),
        ];
        assert_eq!(calculate_obv(&candles), vec![0.0, 50.0, 50.0, 20.0]);
    }

    #[test]
    fn obv_strictly_increasing_on_rising_closes() {
        let candles: Vec<Candle> = (1..=20).map(|i| candle(i as f64, 10.0 + i as f64)).collect();
        let series = calculate_obv(&candles);
        assert!(series.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn obv_strictly_decreasing_on_falling_closes() {
        let candles: Vec<Candle> = (1..=20).rev().map(|i| candle(i as f64, 5.0)).collect();
        let series = calculate_obv(&candles);
        assert!(series.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn obv_change_over_lookback() {
        let candles: Vec<Candle> = (1..=10).map(|i| candle(i as f64, 1.0)).collect();
        let (last, change) = obv_with_change(&candles, 5).unwrap();
        assert_eq!(last, 9.0);
        assert_eq!(change, Some(5.0));

        let (_, change) = obv_with_change(&candles[..5], 5).unwrap();
        assert_eq!(change, None);
    }
}
