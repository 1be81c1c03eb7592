// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band = SMA(period), upper / lower = middle ± k·σ where σ is the
// population standard deviation of the same window.  Band width is the
// normalised distance: BBW = (upper - lower) / middle * 100.

use serde::{Deserialize, Serialize};

/// Result of a Bollinger Band calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
}

/// Where a price sits relative to the bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPosition {
    AboveUpper,
    BelowLower,
    Inside,
}

impl BollingerResult {
    pub fn position(&self, price: f64) -> BandPosition {
        if price > self.upper {
            BandPosition::AboveUpper
        } else if price < self.lower {
            BandPosition::BelowLower
        } else {
            BandPosition::Inside
        }
    }
}

/// Calculate Bollinger Bands over the trailing `period` closes.
///
/// Returns `None` when:
/// - Fewer than `period` data points (or `period == 0`).
/// - Middle band is zero (degenerate input).
/// - Any result is non-finite.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerResult> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;

    if middle == 0.0 {
        return None;
    }

    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    let width = (upper - lower) / middle * 100.0;

    width.is_finite().then_some(BollingerResult {
        upper,
        middle,
        lower,
        width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = calculate_bollinger(&closes, 20, 2.0).unwrap();
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
        assert!((bb.middle - 10.5).abs() < 1e-12);
        // Population σ of 1..=20 is sqrt(33.25).
        assert!((bb.upper - (10.5 + 2.0 * 33.25_f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn bollinger_uses_trailing_window() {
        let mut closes = vec![1_000.0; 10];
        closes.extend(std::iter::repeat(50.0).take(20));
        let bb = calculate_bollinger(&closes, 20, 2.0).unwrap();
        assert!((bb.middle - 50.0).abs() < 1e-12);
    }

    #[test]
    fn bollinger_insufficient_data() {
        assert!(calculate_bollinger(&[1.0, 2.0, 3.0], 20, 2.0).is_none());
    }

    #[test]
    fn bollinger_flat() {
        let bb = calculate_bollinger(&vec![100.0; 20], 20, 2.0).unwrap();
        assert_eq!(bb.upper, bb.middle);
        assert_eq!(bb.lower, bb.middle);
        assert!(bb.width.abs() < 1e-10);
        assert_eq!(bb.position(100.0), BandPosition::Inside);
    }

    #[test]
    fn band_position() {
        let bb = BollingerResult {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
            width: 20.0,
        };
        assert_eq!(bb.position(111.0), BandPosition::AboveUpper);
        assert_eq!(bb.position(89.0), BandPosition::BelowLower);
        assert_eq!(bb.position(100.0), BandPosition::Inside);
    }
}
