pub mod candle;
pub mod source;
pub mod timeframe;

// Re-exports for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::Candle;
pub use source::{CandleSource, FallbackSource};
pub use timeframe::Timeframe;
