// =============================================================================
// Runtime Configuration — bot settings with atomic save
// =============================================================================
//
// Every tunable parameter of the signal bot lives here: which pairs the chat
// commands map to, where candles come from, the indicator periods and the
// threshold/stop policy of the evaluator.
//
// Persistence uses an atomic tmp + rename pattern.  All fields carry
// `#[serde(default)]` so that adding new fields never breaks loading an older
// config file.  Secrets never live in this file; they come from the
// environment (see `BotEnv`).
// =============================================================================

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicators::stoch_rsi::StochRsiParams;
use crate::market_data::Timeframe;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_pairs() -> Vec<PairAlias> {
    [
        ("BTC", "BTCUSDT"),
        ("ETH", "ETHUSDT"),
        ("LINK", "LINKUSDT"),
        ("DOT", "DOTUSDT"),
        ("SUI", "SUIUSDT"),
    ]
    .into_iter()
    .map(|(alias, symbol)| PairAlias {
        alias: alias.to_string(),
        symbol: symbol.to_string(),
    })
    .collect()
}

fn default_candle_limit() -> usize {
    250
}

fn default_min_candles() -> usize {
    2
}

fn default_sources() -> Vec<SourceKind> {
    vec![SourceKind::Binance, SourceKind::CryptoCompare]
}

fn default_binance_endpoints() -> Vec<String> {
    vec![
        "https://api.binance.com".to_string(),
        "https://api1.binance.com".to_string(),
        "https://api2.binance.com".to_string(),
        "https://api-gcp.binance.com".to_string(),
    ]
}

fn default_cryptocompare_base_url() -> String {
    "https://min-api.cryptocompare.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_auto_update_interval_secs() -> u64 {
    3600
}

fn default_ema_fast() -> usize {
    9
}
fn default_ema_slow() -> usize {
    21
}
fn default_ema_trend() -> usize {
    200
}
fn default_period_14() -> usize {
    14
}
fn default_macd_fast() -> usize {
    12
}
fn default_macd_slow() -> usize {
    26
}
fn default_macd_signal() -> usize {
    9
}
fn default_bollinger_period() -> usize {
    20
}
fn default_bollinger_std() -> f64 {
    2.0
}
fn default_obv_lookback() -> usize {
    5
}

fn default_rsi_midline() -> f64 {
    50.0
}
fn default_rsi_overbought() -> f64 {
    70.0
}
fn default_rsi_oversold() -> f64 {
    30.0
}
fn default_stoch_overbought() -> f64 {
    80.0
}
fn default_stoch_oversold() -> f64 {
    20.0
}
fn default_adx_trend_threshold() -> f64 {
    25.0
}

// =============================================================================
// Pairs & sources
// =============================================================================

/// Maps a chat shortcut (`/BTC`) to an exchange symbol (`BTCUSDT`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAlias {
    pub alias: String,
    pub symbol: String,
}

impl PairAlias {
    /// Both halves are non-empty and limited to `A-Z0-9`, so the alias works
    /// as a chat command and the help text needs no Markdown escaping.
    pub fn is_well_formed(&self) -> bool {
        fn token(s: &str) -> bool {
            !s.is_empty() && s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        }
        token(&self.alias) && token(&self.symbol)
    }
}

/// Market-data providers, tried in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Binance,
    CryptoCompare,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binance => write!(f, "Binance"),
            Self::CryptoCompare => write!(f, "CryptoCompare"),
        }
    }
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Periods used by the indicator engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_ema_fast")]
    pub ema_fast: usize,
    #[serde(default = "default_ema_slow")]
    pub ema_slow: usize,
    /// Long trend EMA; 0 disables it.
    #[serde(default = "default_ema_trend")]
    pub ema_trend: usize,
    #[serde(default = "default_period_14")]
    pub rsi_period: usize,
    /// SMA applied to the RSI series.
    #[serde(default = "default_period_14")]
    pub rsi_sma_period: usize,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,
    #[serde(default = "default_bollinger_std")]
    pub bollinger_std: f64,
    #[serde(default = "default_period_14")]
    pub adx_period: usize,
    #[serde(default = "default_period_14")]
    pub atr_period: usize,
    /// Bars over which the OBV change is measured.
    #[serde(default = "default_obv_lookback")]
    pub obv_lookback: usize,
    #[serde(default)]
    pub stoch_rsi: StochRsiParams,
    /// Candles used for the Fibonacci range; 0 means the whole window.
    #[serde(default)]
    pub fibonacci_lookback: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_fast: default_ema_fast(),
            ema_slow: default_ema_slow(),
            ema_trend: default_ema_trend(),
            rsi_period: default_period_14(),
            rsi_sma_period: default_period_14(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            bollinger_period: default_bollinger_period(),
            bollinger_std: default_bollinger_std(),
            adx_period: default_period_14(),
            atr_period: default_period_14(),
            obv_lookback: default_obv_lookback(),
            stoch_rsi: StochRsiParams::default(),
            fibonacci_lookback: 0,
        }
    }
}

/// Fast/slow EMA pair used for a specific timeframe instead of the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmaOverride {
    pub timeframe: Timeframe,
    pub ema_fast: usize,
    pub ema_slow: usize,
}

// =============================================================================
// StrategyParams
// =============================================================================

/// How stop-loss and take-profit levels are placed around the entry price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopPolicy {
    /// Fixed percentage offsets from entry.
    Percentage {
        stop_pct: f64,
        take_profit_pcts: Vec<f64>,
    },
    /// ATR multiples; `fallback_pct` is used when ATR is not available.
    Atr {
        stop_multiplier: f64,
        take_profit_multipliers: Vec<f64>,
        fallback_pct: f64,
    },
}

impl StopPolicy {
    pub fn percentage() -> Self {
        Self::Percentage {
            stop_pct: 3.0,
            take_profit_pcts: vec![3.0],
        }
    }

    pub fn atr() -> Self {
        Self::Atr {
            stop_multiplier: 1.5,
            take_profit_multipliers: vec![1.5, 3.0],
            fallback_pct: 3.0,
        }
    }
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self::percentage()
    }
}

/// Threshold rules used by the signal evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// RSI above this favours longs, below favours shorts.
    #[serde(default = "default_rsi_midline")]
    pub rsi_midline: f64,
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
    #[serde(default = "default_stoch_overbought")]
    pub stoch_overbought: f64,
    #[serde(default = "default_stoch_oversold")]
    pub stoch_oversold: f64,
    /// ADX above this counts as a trending market.
    #[serde(default = "default_adx_trend_threshold")]
    pub adx_trend_threshold: f64,
    #[serde(default)]
    pub stop_policy: StopPolicy,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            rsi_midline: default_rsi_midline(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            stoch_overbought: default_stoch_overbought(),
            stoch_oversold: default_stoch_oversold(),
            adx_trend_threshold: default_adx_trend_threshold(),
            stop_policy: StopPolicy::default(),
        }
    }
}

// =============================================================================
// BotConfig
// =============================================================================

/// Top-level configuration for the signal bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Chat shortcuts and the symbols they resolve to.
    #[serde(default = "default_pairs")]
    pub pairs: Vec<PairAlias>,

    /// Timeframe used when a command does not name one.
    #[serde(default)]
    pub default_timeframe: Timeframe,

    /// Candles requested per signal.
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,

    /// Fewer candles than this aborts the pipeline with "data unavailable".
    #[serde(default = "default_min_candles")]
    pub min_candles: usize,

    /// Candle providers, tried in order.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceKind>,

    /// Binance REST hosts, tried in order.
    #[serde(default = "default_binance_endpoints")]
    pub binance_endpoints: Vec<String>,

    #[serde(default = "default_cryptocompare_base_url")]
    pub cryptocompare_base_url: String,

    /// HTTP timeout for market-data requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How often subscribed chats receive a fresh signal.
    #[serde(default = "default_auto_update_interval_secs")]
    pub auto_update_interval_secs: u64,

    #[serde(default)]
    pub indicators: IndicatorParams,

    /// Per-timeframe EMA pairs.
    #[serde(default)]
    pub ema_overrides: Vec<EmaOverride>,

    #[serde(default)]
    pub strategy: StrategyParams,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            pairs: default_pairs(),
            default_timeframe: Timeframe::default(),
            candle_limit: default_candle_limit(),
            min_candles: default_min_candles(),
            sources: default_sources(),
            binance_endpoints: default_binance_endpoints(),
            cryptocompare_base_url: default_cryptocompare_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            auto_update_interval_secs: default_auto_update_interval_secs(),
            indicators: IndicatorParams::default(),
            ema_overrides: Vec::new(),
            strategy: StrategyParams::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read bot config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse bot config from {}", path.display()))?;

        info!(
            path = %path.display(),
            pairs = config.pairs.len(),
            timeframe = %config.default_timeframe,
            "bot config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration using an atomic write (tmp file + rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise bot config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "bot config saved (atomic)");
        Ok(())
    }

    /// Resolve a chat alias (`btc`) or a full symbol (`ethusdt`) to the
    /// exchange symbol.  Unknown aliases are upper-cased and returned as-is.
    pub fn resolve_symbol(&self, input: &str) -> String {
        let upper = input.trim().to_uppercase();
        self.pairs
            .iter()
            .find(|p| p.alias.eq_ignore_ascii_case(&upper))
            .map(|p| p.symbol.clone())
            .unwrap_or(upper)
    }

    /// Look up a configured alias exactly (case-insensitive).
    pub fn pair_for_alias(&self, alias: &str) -> Option<&PairAlias> {
        self.pairs.iter().find(|p| p.alias.eq_ignore_ascii_case(alias))
    }

    /// Indicator periods for `timeframe`, with any EMA override applied.
    pub fn indicator_params_for(&self, timeframe: Timeframe) -> IndicatorParams {
        let mut params = self.indicators.clone();
        if let Some(o) = self.ema_overrides.iter().find(|o| o.timeframe == timeframe) {
            params.ema_fast = o.ema_fast;
            params.ema_slow = o.ema_slow;
        }
        params
    }

    /// Replace the pair list from a `BTC=BTCUSDT,ETH=ETHUSDT` style string.
    /// A bare entry (`SOLUSDT`) uses the symbol minus a USDT suffix as alias.
    pub fn apply_pairs_override(&mut self, list: &str) -> Result<()> {
        let mut pairs = Vec::new();
        for entry in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let pair = match entry.split_once('=') {
                Some((alias, symbol)) => PairAlias {
                    alias: alias.trim().to_uppercase(),
                    symbol: symbol.trim().to_uppercase(),
                },
                None => {
                    let symbol = entry.to_uppercase();
                    let alias = symbol.strip_suffix("USDT").unwrap_or(&symbol).to_string();
                    PairAlias { alias, symbol }
                }
            };
            if !pair.is_well_formed() {
                bail!("invalid pair entry: {entry}");
            }
            pairs.push(pair);
        }
        if pairs.is_empty() {
            bail!("pair override is empty");
        }
        self.pairs = pairs;
        Ok(())
    }

    /// Sanity checks run once at startup.  Problems are fixed up with a
    /// warning rather than refusing to start.
    pub fn normalise(&mut self) {
        if self.pairs.is_empty() {
            warn!("no pairs configured, restoring defaults");
            self.pairs = default_pairs();
        }
        let before = self.pairs.len();
        self.pairs.retain(PairAlias::is_well_formed);
        if self.pairs.len() != before {
            warn!(dropped = before - self.pairs.len(), "pairs with non-alphanumeric names dropped");
            if self.pairs.is_empty() {
                self.pairs = default_pairs();
            }
        }
        if self.sources.is_empty() {
            warn!("no candle sources configured, restoring defaults");
            self.sources = default_sources();
        }
        if self.binance_endpoints.is_empty() {
            self.binance_endpoints = default_binance_endpoints();
        }
        if self.candle_limit == 0 {
            warn!("candle_limit of 0 is invalid, using default");
            self.candle_limit = default_candle_limit();
        }
        if self.indicators.ema_fast >= self.indicators.ema_slow {
            warn!(
                fast = self.indicators.ema_fast,
                slow = self.indicators.ema_slow,
                "fast EMA period should be shorter than the slow one"
            );
        }
    }
}

// =============================================================================
// BotEnv — secrets and deployment settings from the environment
// =============================================================================

/// Values read from environment variables (optionally via `.env`).
#[derive(Clone)]
pub struct BotEnv {
    pub telegram_token: String,
    /// Public base URL; when present the bot runs in webhook mode.
    pub webhook_url: Option<String>,
    /// Secret Telegram echoes back in `X-Telegram-Bot-Api-Secret-Token`.
    pub webhook_secret: Option<String>,
    pub bind_addr: SocketAddr,
    pub cryptocompare_api_key: Option<String>,
    pub config_path: String,
    /// Comma separated pair override (`SIGNAL_PAIRS`).
    pub pairs_override: Option<String>,
}

impl BotEnv {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup so tests do not touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram_token = get("TELEGRAM_TOKEN").context("TELEGRAM_TOKEN is missing")?;

        let bind_addr = match (get("BIND_ADDR"), get("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => format!("0.0.0.0:{port}"),
            (None, None) => "0.0.0.0:3000".to_string(),
        };
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("invalid bind address {bind_addr}"))?;

        Ok(Self {
            telegram_token,
            webhook_url: get("WEBHOOK_URL").map(|u| u.trim_end_matches('/').to_string()),
            webhook_secret: get("WEBHOOK_SECRET"),
            bind_addr,
            cryptocompare_api_key: get("CRYPTOCOMPARE_API_KEY"),
            config_path: get("BOT_CONFIG").unwrap_or_else(|| "bot_config.json".to_string()),
            pairs_override: get("SIGNAL_PAIRS"),
        })
    }
}

impl std::fmt::Debug for BotEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotEnv")
            .field("telegram_token", &"<redacted>")
            .field("webhook_url", &self.webhook_url)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("bind_addr", &self.bind_addr)
            .field("cryptocompare_api_key", &self.cryptocompare_api_key.as_ref().map(|_| "<redacted>"))
            .field("config_path", &self.config_path)
            .finish()
    }
}
