// =============================================================================
// Signals Module
// =============================================================================
//
// Turns an `IndicatorSnapshot` plus the latest close into a `Signal`:
// - Direction rule (EMA cross + RSI midline + MACD vs signal)
// - Stop-loss / take-profit placement per the configured stop policy
// - Per-indicator commentary, display only

pub mod commentary;
pub mod evaluator;

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorKind;
use crate::types::{Direction, Verdict};

pub use evaluator::evaluate;

/// One display line contributed by a single indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commentary {
    pub indicator: IndicatorKind,
    pub verdict: Verdict,
    pub note: String,
}

/// Evaluated trading signal for one candle window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub entry_price: f64,
    /// `None` for a neutral signal.
    pub stop_loss: Option<f64>,
    /// TP1, TP2, ... in order; empty for a neutral signal.
    pub take_profits: Vec<f64>,
    pub commentary: Vec<Commentary>,
}

impl Signal {
    pub fn is_actionable(&self) -> bool {
        self.direction != Direction::Neutral
    }
}
