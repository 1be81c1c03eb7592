// =============================================================================
// Crypto Signal Bot — Main Entry Point
// =============================================================================
//
// Webhook mode when WEBHOOK_URL is set, long polling otherwise.  The HTTP
// server runs in both modes so the health routes stay reachable.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod binance;
mod bot;
mod cryptocompare;
mod error;
mod indicators;
mod market_data;
mod pipeline;
mod render;
mod runtime_config;
mod signals;
mod telegram;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::binance::BinanceClient;
use crate::cryptocompare::CryptoCompareClient;
use crate::market_data::{CandleSource, FallbackSource};
use crate::runtime_config::{BotConfig, BotEnv, SourceKind};
use crate::telegram::TelegramClient;
use crate::types::BotMode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Crypto Signal Bot starting up");

    let env = BotEnv::from_env()?;

    let mut config = BotConfig::load(&env.config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        let defaults = BotConfig::default();
        if !std::path::Path::new(&env.config_path).exists() {
            if let Err(e) = defaults.save(&env.config_path) {
                warn!(error = %e, "Failed to write default config");
            }
        }
        defaults
    });
    if let Some(pairs) = env.pairs_override.as_deref() {
        config
            .apply_pairs_override(pairs)
            .context("SIGNAL_PAIRS is malformed")?;
    }
    config.normalise();

    let pairs: Vec<&str> = config.pairs.iter().map(|p| p.symbol.as_str()).collect();
    info!(?pairs, timeframe = %config.default_timeframe, sources = ?config.sources, "Configured pairs");

    // ── 2. Candle sources ────────────────────────────────────────────────
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let binance = Arc::new(BinanceClient::new(config.binance_endpoints.clone(), timeout)?);

    let mut sources: Vec<Arc<dyn CandleSource>> = Vec::new();
    for kind in &config.sources {
        match kind {
            SourceKind::Binance => sources.push(binance.clone()),
            SourceKind::CryptoCompare => sources.push(Arc::new(CryptoCompareClient::new(
                config.cryptocompare_base_url.clone(),
                env.cryptocompare_api_key.clone(),
                timeout,
            )?)),
        }
    }
    let chain = FallbackSource::new(sources);
    info!(count = chain.len(), "Candle sources ready");
    let source: Arc<dyn CandleSource> = Arc::new(chain);

    // ── 3. Telegram & shared state ───────────────────────────────────────
    let telegram = Arc::new(TelegramClient::new(env.telegram_token.clone(), timeout)?);
    let mode = if env.webhook_url.is_some() {
        BotMode::Webhook
    } else {
        BotMode::Polling
    };

    let webhook_secret = match mode {
        BotMode::Webhook => {
            if env.webhook_secret.is_none() {
                info!("WEBHOOK_SECRET not set, generated one for this run");
            }
            Some(api::auth::webhook_secret_or_generate(env.webhook_secret.clone()))
        }
        BotMode::Polling => None,
    };

    let config = Arc::new(config);
    let state = Arc::new(
        AppState::new(config, source, telegram.clone(), mode, webhook_secret.clone())
            .with_binance(binance),
    );

    match telegram.get_me().await {
        Ok(me) => {
            info!(username = ?me.username, "Telegram bot identity confirmed");
            state.set_bot_username(me.username);
        }
        Err(e) => warn!(error = %e, "getMe failed, commands addressed to other bots will not be filtered"),
    }

    // ── 4. Update delivery ───────────────────────────────────────────────
    match env.webhook_url.as_deref() {
        Some(base) => {
            let url = format!("{base}{}", api::rest::WEBHOOK_PATH);
            telegram
                .set_webhook(&url, webhook_secret.as_deref())
                .await
                .context("failed to register webhook")?;
            info!(%url, "Webhook mode");
        }
        None => {
            if let Err(e) = telegram.delete_webhook().await {
                warn!(error = %e, "deleteWebhook failed, polling may be rejected");
            }
            let poll_state = state.clone();
            let poll_client = telegram.clone();
            tokio::spawn(async move {
                bot::polling::run_polling(poll_client, poll_state).await;
            });
            info!("Polling mode");
        }
    }

    // ── 5. HTTP server ───────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(env.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", env.bind_addr))?;
    info!(addr = %env.bind_addr, "HTTP server listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    // ── 6. Auto-update loop ──────────────────────────────────────────────
    let auto_state = state.clone();
    tokio::spawn(async move {
        bot::auto_update::run_auto_updates(auto_state).await;
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 7. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");

    if mode == BotMode::Webhook {
        if let Err(e) = telegram.delete_webhook().await {
            error!(error = %e, "Failed to remove webhook on shutdown");
        }
    }

    info!(
        signals = state.signals_sent(),
        failures = state.signal_failures(),
        "Crypto Signal Bot shut down complete."
    );
    Ok(())
}
