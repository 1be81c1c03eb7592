// =============================================================================
// Moving Averages — SMA and EMA
// =============================================================================
//
// EMA gives more weight to recent prices than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `period` values.
// =============================================================================

/// Compute the EMA series for `values` and look-back `period`.
///
/// Returns an empty `Vec` when the input is too short or the period is zero.
/// Each output element corresponds to an input starting at index `period - 1`.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `values.len() < period` => empty vec
/// - Any non-finite input or intermediate value => empty vec
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let sma: f64 = values[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &value in &values[period..] {
        let ema = (value - prev_ema) * multiplier + prev_ema;
        if !ema.is_finite() {
            return Vec::new();
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// Most recent EMA value, if the series is long enough.
pub fn last_ema(values: &[f64], period: usize) -> Option<f64> {
    calculate_ema(values, period).last().copied()
}

/// Compute the rolling SMA series.  One output per input starting at index
/// `period - 1`; empty when the input is too short.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}
