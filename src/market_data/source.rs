// =============================================================================
// Candle Sources — pluggable market-data providers
// =============================================================================
//
// The signal pipeline never talks HTTP itself.  It asks a `CandleSource` for an
// ordered (oldest-first) window of candles and treats any failure as "data
// unavailable".  Timeouts, endpoint rotation and rate limiting are the source's
// concern.
// =============================================================================

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Candle, Timeframe};

/// Anything that can supply a candle window for a symbol.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch up to `limit` candles of width `timeframe` for `symbol`,
    /// oldest-first.
    async fn fetch(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>>;
}

/// Tries each inner source in order; the first non-empty success wins.
pub struct FallbackSource {
    sources: Vec<Arc<dyn CandleSource>>,
}

impl FallbackSource {
    pub fn new(sources: Vec<Arc<dyn CandleSource>>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl CandleSource for FallbackSource {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn fetch(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>> {
        let mut last_error = None;

        for source in &self.sources {
            match source.fetch(symbol, timeframe, limit).await {
                Ok(candles) if !candles.is_empty() => {
                    debug!(source = source.name(), symbol, count = candles.len(), "candles fetched");
                    return Ok(candles);
                }
                Ok(_) => {
                    warn!(source = source.name(), symbol, "source returned no candles");
                }
                Err(e) => {
                    warn!(source = source.name(), symbol, error = %e, "source failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e.context(format!("all candle sources failed for {symbol}"))),
            None => bail!("no candle source returned data for {symbol}"),
        }
    }
}
