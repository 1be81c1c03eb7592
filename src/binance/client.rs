// =============================================================================
// Binance REST API Client — public kline data with endpoint fallback
// =============================================================================
//
// Only the unauthenticated `/api/v3/klines` endpoint is used.  Binance serves
// the same API from several hosts; when one is unreachable or geo-blocked the
// next is tried in order.  Every response feeds the shared weight tracker.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, instrument, warn};

use super::rate_limit::RateLimitTracker;
use crate::market_data::{Candle, CandleSource, Timeframe};

/// Largest page Binance returns for one klines request.
const MAX_KLINES: usize = 1000;
/// Request weight of one klines call with limit <= 1000.
const KLINES_WEIGHT: u32 = 2;

const USER_AGENT_VALUE: &str = "Mozilla/5.0 TelegramCryptoBot";

/// Binance public market-data client.
#[derive(Clone)]
pub struct BinanceClient {
    endpoints: Vec<String>,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    /// Create a client that tries `endpoints` (base URLs such as
    /// `https://api.binance.com`) in order.
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self> {
        if endpoints.is_empty() {
            bail!("at least one Binance endpoint is required");
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        let endpoints = endpoints
            .into_iter()
            .map(|e| e.trim_end_matches('/').to_string())
            .collect::<Vec<_>>();

        debug!(endpoints = endpoints.len(), "BinanceClient initialised");

        Ok(Self {
            endpoints,
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    /// GET /api/v3/klines on each endpoint until one answers.
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        if !self.rate_limit.can_send_request(KLINES_WEIGHT) {
            bail!("Binance request weight limit reached, backing off");
        }

        let limit = limit.clamp(1, MAX_KLINES);
        let mut last_error = None;

        for base in &self.endpoints {
            match self.get_klines_from(base, symbol, interval, limit).await {
                Ok(candles) => {
                    debug!(endpoint = %base, symbol, interval, count = candles.len(), "klines fetched");
                    return Ok(candles);
                }
                Err(e) => {
                    warn!(endpoint = %base, symbol, error = %e, "Binance fetch failed, trying next endpoint");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e.context("all Binance endpoints failed")),
            None => bail!("all Binance endpoints failed"),
        }
    }

    async fn get_klines_from(&self, base: &str, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        let url = format!("{base}/api/v3/klines");
        let limit = limit.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        parse_klines(&body)
    }
}

/// Parse Binance's array-of-arrays klines response.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
///   [6] closeTime, ...
pub fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());

    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let open_time = arr[0].as_i64().context("kline open time is not an integer")?;
        let candle = Candle::new(
            open_time,
            parse_str_f64(&arr[1])?,
            parse_str_f64(&arr[2])?,
            parse_str_f64(&arr[3])?,
            parse_str_f64(&arr[4])?,
            parse_str_f64(&arr[5])?,
        );
        candles.push(candle);
    }

    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        bail!("expected string or number, got: {val}")
    }
}

#[async_trait]
impl CandleSource for BinanceClient {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn fetch(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>> {
        self.get_klines(symbol, &timeframe.binance_interval(), limit).await
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("endpoints", &self.endpoints)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}
