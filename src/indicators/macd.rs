// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD line = EMA(fast) - EMA(slow)
//   signal    = EMA(signal_period) of the MACD line
//   histogram = MACD line - signal
//
// Both price EMAs are SMA-seeded; the MACD line starts once the slow EMA
// exists, and the signal EMA is seeded with the SMA of the first
// `signal_period` MACD values.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::ema::calculate_ema;

/// Latest MACD reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the MACD line series (one value per close from index `slow - 1`).
///
/// Returns an empty vec when `fast >= slow`, a period is zero, or the input is
/// shorter than `slow`.
pub fn calculate_macd_line(closes: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    if fast == 0 || fast >= slow {
        return Vec::new();
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);
    if slow_ema.is_empty() || fast_ema.len() < slow_ema.len() {
        return Vec::new();
    }

    // Align the fast series on the tail of the slow one.
    let offset = fast_ema.len() - slow_ema.len();
    fast_ema[offset..]
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect()
}

/// Compute the most recent MACD line / signal / histogram.
///
/// Returns `None` when there are fewer than `slow + signal - 1` closes.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdValue> {
    let line = calculate_macd_line(closes, fast, slow);
    let signal_series = calculate_ema(&line, signal);

    let macd = *line.last()?;
    let signal = *signal_series.last()?;
    let histogram = macd - signal;

    histogram.is_finite().then_some(MacdValue {
        macd,
        signal,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_insufficient_data() {
        let closes: Vec<f64> = (1..=33).map(|x| x as f64).collect();
        // Line exists from 26 closes, signal needs 26 + 9 - 1 = 34.
        assert_eq!(calculate_macd_line(&closes, 12, 26).len(), 8);
        assert!(calculate_macd(&closes, 12, 26, 9).is_none());

        let closes: Vec<f64> = (1..=34).map(|x| x as f64).collect();
        assert!(calculate_macd(&closes, 12, 26, 9).is_some());
    }

    #[test]
    fn macd_rejects_bad_periods() {
        let closes: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        assert!(calculate_macd_line(&closes, 26, 12).is_empty());
        assert!(calculate_macd_line(&closes, 0, 12).is_empty());
        assert!(calculate_macd(&closes, 12, 26, 0).is_none());
    }

    #[test]
    fn macd_flat_series_is_zero() {
        let m = calculate_macd(&vec![250.0; 60], 12, 26, 9).unwrap();
        assert!(m.macd.abs() < 1e-9);
        assert!(m.signal.abs() < 1e-9);
        assert!(m.histogram.abs() < 1e-9);
    }

    #[test]
    fn macd_line_matches_ema_difference() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.2).sin() * 5.0).collect();
        let line = calculate_macd_line(&closes, 12, 26);
        let e12 = *calculate_ema(&closes, 12).last().unwrap();
        let e26 = *calculate_ema(&closes, 26).last().unwrap();
        assert!((line.last().unwrap() - (e12 - e26)).abs() < 1e-12);
    }

    #[test]
    fn macd_uptrend_positive() {
        let closes: Vec<f64> = (1..=80).map(|x| (x * x) as f64).collect();
        let m = calculate_macd(&closes, 12, 26, 9).unwrap();
        assert!(m.macd > 0.0);
        assert!(m.histogram > 0.0, "accelerating trend keeps MACD above signal");
    }
}
