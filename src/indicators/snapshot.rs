// =============================================================================
// Indicator Snapshot — latest value of every supported indicator
// =============================================================================
//
// The indicator engine runs the fixed battery over one candle window.  Each
// field is optional: a window shorter than an indicator's warm-up leaves that
// field `None` (insufficient history is reported, never raised).
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use super::adx::{calculate_adx, AdxValue};
use super::atr::calculate_atr;
use super::bollinger::{calculate_bollinger, BollingerResult};
use super::ema::{calculate_sma, last_ema};
use super::fibonacci::{calculate_fibonacci, FibonacciLevels};
use super::macd::{calculate_macd, MacdValue};
use super::obv::obv_with_change;
use super::rsi::calculate_rsi;
use super::stoch_rsi::{calculate_stoch_rsi, StochRsiValue};
use crate::market_data::candle::{closes, Candle};
use crate::runtime_config::IndicatorParams;

/// Every indicator the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Ema,
    EmaTrend,
    Rsi,
    Macd,
    Bollinger,
    Adx,
    Atr,
    Obv,
    StochRsi,
    Fibonacci,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 10] = [
        Self::Ema,
        Self::EmaTrend,
        Self::Rsi,
        Self::Macd,
        Self::Bollinger,
        Self::Adx,
        Self::Atr,
        Self::Obv,
        Self::StochRsi,
        Self::Fibonacci,
    ];
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ema => "EMA",
            Self::EmaTrend => "Trend EMA",
            Self::Rsi => "RSI",
            Self::Macd => "MACD",
            Self::Bollinger => "Bollinger",
            Self::Adx => "ADX",
            Self::Atr => "ATR",
            Self::Obv => "OBV",
            Self::StochRsi => "Stoch RSI",
            Self::Fibonacci => "Fibonacci",
        };
        f.write_str(name)
    }
}

/// Fast/slow EMA pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaPair {
    pub fast_period: usize,
    pub slow_period: usize,
    pub fast: f64,
    pub slow: f64,
}

/// Long trend EMA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaTrend {
    pub period: usize,
    pub value: f64,
}

/// RSI and its smoothing SMA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiValue {
    pub value: f64,
    /// SMA of the RSI series; `None` until enough RSI values exist.
    pub sma: Option<f64>,
}

/// OBV and its change over the configured look-back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObvValue {
    pub value: f64,
    pub change: Option<f64>,
}

/// Latest reading of every indicator over one candle window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema: Option<EmaPair>,
    pub ema_trend: Option<EmaTrend>,
    pub rsi: Option<RsiValue>,
    pub macd: Option<MacdValue>,
    pub bollinger: Option<BollingerResult>,
    pub adx: Option<AdxValue>,
    pub atr: Option<f64>,
    pub obv: Option<ObvValue>,
    pub stoch_rsi: Option<StochRsiValue>,
    pub fibonacci: Option<FibonacciLevels>,
}

impl IndicatorSnapshot {
    /// Run the full indicator battery over `candles` (oldest first).
    pub fn compute(candles: &[Candle], params: &IndicatorParams) -> Self {
        let closes = closes(candles);

        let ema = match (
            last_ema(&closes, params.ema_fast),
            last_ema(&closes, params.ema_slow),
        ) {
            (Some(fast), Some(slow)) => Some(EmaPair {
                fast_period: params.ema_fast,
                slow_period: params.ema_slow,
                fast,
                slow,
            }),
            _ => None,
        };

        let ema_trend = last_ema(&closes, params.ema_trend).map(|value| EmaTrend {
            period: params.ema_trend,
            value,
        });

        let rsi_series = calculate_rsi(&closes, params.rsi_period);
        let rsi = rsi_series.last().map(|&value| RsiValue {
            value,
            sma: calculate_sma(&rsi_series, params.rsi_sma_period).last().copied(),
        });

        let obv = obv_with_change(candles, params.obv_lookback)
            .map(|(value, change)| ObvValue { value, change });

        Self {
            ema,
            ema_trend,
            rsi,
            macd: calculate_macd(&closes, params.macd_fast, params.macd_slow, params.macd_signal),
            bollinger: calculate_bollinger(&closes, params.bollinger_period, params.bollinger_std),
            adx: calculate_adx(candles, params.adx_period),
            atr: calculate_atr(candles, params.atr_period),
            obv,
            stoch_rsi: calculate_stoch_rsi(&closes, params.stoch_rsi),
            fibonacci: calculate_fibonacci(candles, params.fibonacci_lookback),
        }
    }

    /// Whether the given indicator produced a value.
    pub fn has(&self, kind: IndicatorKind) -> bool {
        match kind {
            IndicatorKind::Ema => self.ema.is_some(),
            IndicatorKind::EmaTrend => self.ema_trend.is_some(),
            IndicatorKind::Rsi => self.rsi.is_some(),
            IndicatorKind::Macd => self.macd.is_some(),
            IndicatorKind::Bollinger => self.bollinger.is_some(),
            IndicatorKind::Adx => self.adx.is_some(),
            IndicatorKind::Atr => self.atr.is_some(),
            IndicatorKind::Obv => self.obv.is_some(),
            IndicatorKind::StochRsi => self.stoch_rsi.is_some(),
            IndicatorKind::Fibonacci => self.fibonacci.is_some(),
        }
    }

    /// Indicators left empty because the window was too short.
    pub fn missing(&self) -> Vec<IndicatorKind> {
        IndicatorKind::ALL
            .into_iter()
            .filter(|&k| !self.has(k))
            .collect()
    }
}
