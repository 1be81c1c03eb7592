// =============================================================================
// CryptoCompare market data
// =============================================================================

pub mod client;

pub use client::CryptoCompareClient;
