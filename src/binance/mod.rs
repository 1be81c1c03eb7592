// =============================================================================
// Binance market data
// =============================================================================

pub mod client;
pub mod rate_limit;

pub use client::BinanceClient;
