// =============================================================================
// Central Application State
// =============================================================================
//
// Shared by the webhook router, the long-poll loop, the auto-update task and
// every spawned update handler via `Arc<AppState>`.
//
// Thread safety:
//   - Atomic counters for lock-free activity tracking.
//   - parking_lot::RwLock for the few mutable values (bot username,
//     subscriptions).
//   - The pipeline and its candle source are immutable after startup.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::binance::rate_limit::RateLimitSnapshot;
use crate::binance::BinanceClient;
use crate::bot::subscriptions::SubscriptionStore;
use crate::market_data::CandleSource;
use crate::pipeline::SignalPipeline;
use crate::runtime_config::BotConfig;
use crate::telegram::ChatSender;
use crate::types::BotMode;

// =============================================================================
// Health snapshot
// =============================================================================

/// Payload of `GET /api/v1/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub mode: String,
    pub bot_username: Option<String>,
    pub uptime_secs: u64,
    pub updates_handled: u64,
    pub signals_sent: u64,
    pub signal_failures: u64,
    pub subscriptions: usize,
    pub pairs: Vec<String>,
    pub binance_weight: Option<RateLimitSnapshot>,
    pub server_time: i64,
}

// =============================================================================
// AppState
// =============================================================================

pub struct AppState {
    pub config: Arc<BotConfig>,
    pub pipeline: SignalPipeline,
    pub sender: Arc<dyn ChatSender>,
    pub subscriptions: SubscriptionStore,
    pub mode: BotMode,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` value in webhook mode.
    pub webhook_secret: Option<String>,

    /// Filled in once `getMe` succeeds; used to drop `/cmd@OtherBot`.
    bot_username: RwLock<Option<String>>,
    binance: Option<Arc<BinanceClient>>,

    // ── Activity counters ───────────────────────────────────────────────
    updates_handled: AtomicU64,
    signals_sent: AtomicU64,
    signal_failures: AtomicU64,

    start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: Arc<BotConfig>,
        source: Arc<dyn CandleSource>,
        sender: Arc<dyn ChatSender>,
        mode: BotMode,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            pipeline: SignalPipeline::new(source, config.clone()),
            config,
            sender,
            subscriptions: SubscriptionStore::new(),
            mode,
            webhook_secret,
            bot_username: RwLock::new(None),
            binance: None,
            updates_handled: AtomicU64::new(0),
            signals_sent: AtomicU64::new(0),
            signal_failures: AtomicU64::new(0),
            start_time: std::time::Instant::now(),
        }
    }

    /// Expose the Binance client's request-weight counter in health output.
    pub fn with_binance(mut self, client: Arc<BinanceClient>) -> Self {
        self.binance = Some(client);
        self
    }

    pub fn bot_username(&self) -> Option<String> {
        self.bot_username.read().clone()
    }

    pub fn set_bot_username(&self, username: Option<String>) {
        *self.bot_username.write() = username;
    }

    // ── Counters ────────────────────────────────────────────────────────

    pub fn record_update(&self) {
        self.updates_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_signal(&self) {
        self.signals_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.signal_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn signals_sent(&self) -> u64 {
        self.signals_sent.load(Ordering::Relaxed)
    }

    pub fn signal_failures(&self) -> u64 {
        self.signal_failures.load(Ordering::Relaxed)
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            mode: self.mode.to_string(),
            bot_username: self.bot_username(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            updates_handled: self.updates_handled.load(Ordering::Relaxed),
            signals_sent: self.signals_sent(),
            signal_failures: self.signal_failures(),
            subscriptions: self.subscriptions.len(),
            pairs: self.config.pairs.iter().map(|p| p.symbol.clone()).collect(),
            binance_weight: self.binance.as_ref().map(|b| b.rate_limit().snapshot()),
            server_time: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("mode", &self.mode)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
