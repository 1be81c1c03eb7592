// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline:
//   1. Compute +DM (positive directional movement) and -DM per bar.
//   2. Compute True Range (TR) per bar.
//   3. Apply Wilder's smoothing (period) to +DM, -DM, and TR.
//   4. Derive +DI = smoothed(+DM) / smoothed(TR) * 100
//            -DI = smoothed(-DM) / smoothed(TR) * 100
//   5. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   6. ADX = Wilder's smoothed average of DX over `period` bars.
//
// Interpretation:
//   ADX > 25  => trending market
//   ADX < 20  => ranging / choppy market
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::Candle;

/// Latest ADX reading together with the directional indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdxValue {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Compute the most recent ADX value from a slice of candles.
///
/// Returns `None` when:
/// - `period` is zero.
/// - There are fewer than `2 * period + 1` candles (`period` bars for the
///   initial smoothing, `period` DX values to seed the ADX, plus the first
///   candle that has no predecessor).
/// - Any intermediate calculation produces a non-finite result.
pub fn calculate_adx(candles: &[Candle], period: usize) -> Option<AdxValue> {
    if period == 0 || candles.len() < 2 * period + 1 {
        return None;
    }
    if !candles.iter().all(Candle::is_finite) {
        return None;
    }

    let period_f = period as f64;
    let bar_count = candles.len() - 1;

    // ------------------------------------------------------------------
    // Step 1 & 2: Raw +DM, -DM, and True Range for each consecutive pair
    // ------------------------------------------------------------------
    let mut plus_dm = Vec::with_capacity(bar_count);
    let mut minus_dm = Vec::with_capacity(bar_count);
    let mut tr_vals = Vec::with_capacity(bar_count);

    for w in candles.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);

        let tr = (cur.high - cur.low)
            .max((cur.high - prev.close).abs())
            .max((cur.low - prev.close).abs());

        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
        tr_vals.push(tr);
    }

    // ------------------------------------------------------------------
    // Step 3: Wilder's smoothing of +DM, -DM, TR
    // ------------------------------------------------------------------
    let mut smooth_plus_dm: f64 = plus_dm[..period].iter().sum();
    let mut smooth_minus_dm: f64 = minus_dm[..period].iter().sum();
    let mut smooth_tr: f64 = tr_vals[..period].iter().sum();

    let mut dx_values: Vec<f64> = Vec::with_capacity(bar_count - period + 1);
    let mut last_di = directional_indices(smooth_plus_dm, smooth_minus_dm, smooth_tr)?;
    dx_values.push(compute_dx(last_di)?);

    for i in period..bar_count {
        smooth_plus_dm = smooth_plus_dm - smooth_plus_dm / period_f + plus_dm[i];
        smooth_minus_dm = smooth_minus_dm - smooth_minus_dm / period_f + minus_dm[i];
        smooth_tr = smooth_tr - smooth_tr / period_f + tr_vals[i];

        last_di = directional_indices(smooth_plus_dm, smooth_minus_dm, smooth_tr)?;
        dx_values.push(compute_dx(last_di)?);
    }

    // ------------------------------------------------------------------
    // Step 6: ADX = Wilder's smoothed average of DX
    // ------------------------------------------------------------------
    if dx_values.len() < period {
        return None;
    }

    let mut adx: f64 = dx_values[..period].iter().sum::<f64>() / period_f;
    for &dx in &dx_values[period..] {
        adx = (adx * (period_f - 1.0) + dx) / period_f;
    }

    if !adx.is_finite() {
        return None;
    }

    let (plus_di, minus_di) = last_di;
    Some(AdxValue {
        adx,
        plus_di,
        minus_di,
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

/// +DI / -DI from smoothed movement and range.  `None` when the range is zero.
fn directional_indices(smooth_plus_dm: f64, smooth_minus_dm: f64, smooth_tr: f64) -> Option<(f64, f64)> {
    if smooth_tr == 0.0 {
        return None;
    }
    let plus_di = (smooth_plus_dm / smooth_tr) * 100.0;
    let minus_di = (smooth_minus_dm / smooth_tr) * 100.0;
    (plus_di.is_finite() && minus_di.is_finite()).then_some((plus_di, minus_di))
}

fn compute_dx((plus_di, minus_di): (f64, f64)) -> Option<f64> {
    let di_sum = plus_di + minus_di;
    if di_sum == 0.0 {
        // No directional movement.
        return Some(0.0);
    }

    let dx = ((plus_di - minus_di).abs() / di_sum) * 100.0;
    dx.is_finite().then_some(dx)
}
