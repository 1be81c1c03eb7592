// =============================================================================
// Stochastic RSI
// =============================================================================
//
// Applies the stochastic oscillator to the RSI series:
//   raw = (RSI - min(RSI, n)) / (max(RSI, n) - min(RSI, n)) * 100
//   %K  = SMA(raw, k_smoothing)
//   %D  = SMA(%K, d_smoothing)
//
// A flat RSI window (max == min) yields raw = 0.

use serde::{Deserialize, Serialize};

use super::ema::calculate_sma;
use super::rsi::calculate_rsi;

/// Parameters for the Stochastic RSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StochRsiParams {
    pub rsi_period: usize,
    pub stochastic_period: usize,
    pub k_smoothing: usize,
    pub d_smoothing: usize,
}

impl Default for StochRsiParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            stochastic_period: 14,
            k_smoothing: 3,
            d_smoothing: 3,
        }
    }
}

/// Latest %K / %D reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochRsiValue {
    pub k: f64,
    pub d: f64,
}

/// Compute the most recent Stochastic RSI from `closes`.
pub fn calculate_stoch_rsi(closes: &[f64], params: StochRsiParams) -> Option<StochRsiValue> {
    let n = params.stochastic_period;
    if n == 0 {
        return None;
    }

    let rsi = calculate_rsi(closes, params.rsi_period);
    if rsi.len() < n {
        return None;
    }

    let raw: Vec<f64> = rsi
        .windows(n)
        .map(|w| {
            let current = w[n - 1];
            let lowest = w.iter().copied().fold(f64::INFINITY, f64::min);
            let highest = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = highest - lowest;
            if range == 0.0 {
                0.0
            } else {
                (current - lowest) / range * 100.0
            }
        })
        .collect();

    let k_series = calculate_sma(&raw, params.k_smoothing);
    let d_series = calculate_sma(&k_series, params.d_smoothing);

    let k = *k_series.last()?;
    let d = *d_series.last()?;
    (k.is_finite() && d.is_finite()).then_some(StochRsiValue { k, d })
}
