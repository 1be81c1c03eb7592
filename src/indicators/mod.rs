// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicator battery used by the
// signal pipeline.  Latest-value functions return `Option<T>` so callers are
// forced to handle insufficient-data and numerical-edge-case scenarios;
// `snapshot` runs the whole battery over one candle window.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod fibonacci;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod snapshot;
pub mod stoch_rsi;

pub use snapshot::{IndicatorKind, IndicatorSnapshot};
