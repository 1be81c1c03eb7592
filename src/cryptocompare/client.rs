// =============================================================================
// CryptoCompare REST Client — histominute / histohour / histoday
// =============================================================================
//
// Used as a second candle source when Binance is unreachable.  Symbols arrive
// in exchange form (`BTCUSDT`) and are split into `fsym` / `tsym` using a list
// of known quote assets.  Timestamps come back in seconds and are converted to
// milliseconds to match Binance.
// =============================================================================

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::market_data::{Candle, CandleSource, Timeframe};

/// Quote assets recognised when splitting a pair, longest match first.
const QUOTE_ASSETS: &[&str] = &["USDT", "USDC", "BUSD", "FDUSD", "TUSD", "USD", "EUR", "BTC", "ETH"];

/// Largest `limit` accepted by the history endpoints.
const MAX_LIMIT: usize = 2000;

/// Split `BTCUSDT` into (`BTC`, `USDT`).  A `/` or `-` separator is honoured.
pub fn split_symbol(symbol: &str) -> Result<(String, String)> {
    let upper = symbol.trim().to_uppercase();

    if let Some((base, quote)) = upper.split_once(['/', '-']) {
        if !base.is_empty() && !quote.is_empty() {
            return Ok((base.to_string(), quote.to_string()));
        }
    }

    for quote in QUOTE_ASSETS {
        if let Some(base) = upper.strip_suffix(quote) {
            if !base.is_empty() {
                return Ok((base.to_string(), quote.to_string()));
            }
        }
    }

    bail!("cannot split {symbol} into base and quote assets")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistoResponse {
    response: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<HistoData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistoData {
    #[serde(default)]
    data: Vec<HistoBar>,
}

#[derive(Debug, Deserialize)]
struct HistoBar {
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volumefrom: f64,
}

/// Parse a `/data/v2/histo*` response body.
///
/// Leading all-zero bars (CryptoCompare pads history before listing) are
/// dropped.
pub fn parse_histo(body: &str) -> Result<Vec<Candle>> {
    let resp: HistoResponse = serde_json::from_str(body).context("failed to parse histo response")?;

    if resp.response != "Success" {
        bail!("CryptoCompare returned {}: {}", resp.response, resp.message);
    }

    let bars = resp.data.map(|d| d.data).unwrap_or_default();
    let candles = bars
        .into_iter()
        .skip_while(|b| b.open == 0.0 && b.close == 0.0 && b.high == 0.0 && b.low == 0.0)
        .map(|b| Candle::new(b.time * 1000, b.open, b.high, b.low, b.close, b.volumefrom))
        .collect();
    Ok(candles)
}

/// CryptoCompare public market-data client.
#[derive(Clone)]
pub struct CryptoCompareClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CryptoCompareClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, keyed = api_key.is_some(), "CryptoCompareClient initialised");

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    /// GET /data/v2/{endpoint}?fsym=..&tsym=..&limit=..&aggregate=..
    #[instrument(skip(self), name = "cryptocompare::get_history")]
    pub async fn get_history(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>> {
        let (fsym, tsym) = split_symbol(symbol)?;
        let (endpoint, aggregate) = timeframe.cryptocompare_endpoint();
        // The endpoint returns `limit + 1` bars.
        let limit = limit.clamp(1, MAX_LIMIT) - 1;
        let url = format!("{}/data/v2/{endpoint}", self.base_url);

        let mut request = self.client.get(&url).query(&[
            ("fsym", fsym.as_str()),
            ("tsym", tsym.as_str()),
            ("limit", limit.to_string().as_str()),
            ("aggregate", aggregate.to_string().as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Apikey {key}"));
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("GET /data/v2/{endpoint} request failed"))?;

        let status = resp.status();
        let body = resp.text().await.context("failed to read histo response")?;
        if !status.is_success() {
            bail!("CryptoCompare GET /data/v2/{endpoint} returned {status}: {body}");
        }

        let candles = parse_histo(&body)?;
        debug!(symbol, endpoint, aggregate, count = candles.len(), "history fetched");
        Ok(candles)
    }
}

#[async_trait]
impl CandleSource for CryptoCompareClient {
    fn name(&self) -> &'static str {
        "cryptocompare"
    }

    async fn fetch(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>> {
        self.get_history(symbol, timeframe, limit).await
    }
}

impl std::fmt::Debug for CryptoCompareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoCompareClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_known_quotes() {
        assert_eq!(split_symbol("BTCUSDT").unwrap(), ("BTC".into(), "USDT".into()));
        assert_eq!(split_symbol("ethbtc").unwrap(), ("ETH".into(), "BTC".into()));
        assert_eq!(split_symbol("SOLUSD").unwrap(), ("SOL".into(), "USD".into()));
        assert_eq!(split_symbol("LINK/EUR").unwrap(), ("LINK".into(), "EUR".into()));
        assert!(split_symbol("USDT").is_err());
        assert!(split_symbol("XYZ").is_err());
    }

    #[test]
    fn parses_success_body() {
        let body = r#"{
            "Response": "Success",
            "Message": "",
            "Data": {
                "Aggregated": false,
                "TimeFrom": 1704063600,
                "TimeTo": 1704070800,
                "Data": [
                    {"time": 1704063600, "high": 0, "low": 0, "open": 0, "close": 0, "volumefrom": 0, "volumeto": 0},
                    {"time": 1704067200, "high": 42299.15, "low": 42084.8, "open": 42150.0, "close": 42250.62, "volumefrom": 533.5, "volumeto": 1},
                    {"time": 1704070800, "high": 42433.25, "low": 42173.96, "open": 42250.62, "close": 42353.58, "volumefrom": 1017.4, "volumeto": 1}
                ]
            }
        }"#;
        let candles = parse_histo(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1_704_067_200_000);
        assert_eq!(candles[1].close, 42353.58);
        assert_eq!(candles[0].volume, 533.5);
    }

    #[test]
    fn error_body_is_error() {
        let body = r#"{"Response": "Error", "Message": "fsym param is invalid", "Data": {}}"#;
        let err = parse_histo(body).unwrap_err();
        assert!(err.to_string().contains("fsym param is invalid"));
    }

    #[test]
    fn debug_redacts_key() {
        let client = CryptoCompareClient::new(
            "https://min-api.cryptocompare.com/",
            Some("topsecret".into()),
            Duration::from_secs(1),
        )
        .unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("topsecret"));
        assert!(dbg.contains("https://min-api.cryptocompare.com\""));
    }
}
