// =============================================================================
// Update handling — command dispatch and replies
// =============================================================================
//
// Shared by webhook and long-poll modes.  Each update runs on its own task;
// a failed send is logged and never aborts the handler.
// =============================================================================

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::commands::{parse_command, Command};
use crate::app_state::AppState;
use crate::market_data::Timeframe;
use crate::render;
use crate::telegram::{OutgoingMessage, Update};

/// Handle one Telegram update.  Non-command text is ignored.
#[instrument(skip(state, update), fields(update_id = update.update_id), name = "bot::handle_update")]
pub async fn handle_update(state: &Arc<AppState>, update: Update) {
    state.record_update();

    let Some(message) = update.command_message() else {
        debug!("update without a message, skipping");
        return;
    };
    let Some(text) = message.text.as_deref() else {
        return;
    };

    let username = state.bot_username();
    let Some(command) = parse_command(text, username.as_deref(), &state.config) else {
        return;
    };

    handle_command(state, message.chat.id, command).await;
}

/// Execute a parsed command for `chat_id`.
pub async fn handle_command(state: &Arc<AppState>, chat_id: i64, command: Command) {
    let pairs = &state.config.pairs;
    debug!(chat_id, ?command, "command received");

    match command {
        Command::Start => reply(state, OutgoingMessage::markdown(chat_id, render::welcome(pairs))).await,
        Command::Help => reply(state, OutgoingMessage::markdown(chat_id, render::help(pairs))).await,
        Command::Pairs => reply(state, OutgoingMessage::markdown(chat_id, render::pairs(pairs))).await,
        Command::Signal { symbol, timeframe } => {
            let timeframe = timeframe.unwrap_or(state.config.default_timeframe);
            reply(state, OutgoingMessage::markdown(chat_id, render::fetching(&symbol))).await;
            send_signal(state, chat_id, &symbol, timeframe).await;
        }
        Command::Auto { symbol, timeframe } => {
            let timeframe = timeframe.unwrap_or(state.config.default_timeframe);
            if state.subscriptions.subscribe(chat_id, symbol.clone(), timeframe).is_some() {
                info!(chat_id, symbol = %symbol, %timeframe, "auto update replaced");
            } else {
                info!(chat_id, symbol = %symbol, %timeframe, "auto update started");
            }
            let text = render::auto_started(
                &symbol,
                &timeframe.to_string(),
                state.config.auto_update_interval_secs,
            );
            reply(state, OutgoingMessage::markdown(chat_id, text)).await;
            send_signal(state, chat_id, &symbol, timeframe).await;
        }
        Command::Stop => {
            let had = state.subscriptions.unsubscribe(chat_id).is_some();
            if had {
                info!(chat_id, "auto update stopped");
            }
            reply(state, OutgoingMessage::markdown(chat_id, render::auto_stopped(had))).await;
        }
        Command::Invalid(problem) => {
            reply(state, OutgoingMessage::plain(chat_id, render::usage(&problem))).await
        }
        Command::Unknown(name) => {
            reply(state, OutgoingMessage::plain(chat_id, render::unknown_command(&name))).await
        }
    }
}

/// Run the pipeline and deliver either the signal or the unavailable notice.
/// Returns `true` when a signal was computed.
pub async fn send_signal(state: &Arc<AppState>, chat_id: i64, symbol: &str, timeframe: Timeframe) -> bool {
    match state.pipeline.run(symbol, timeframe).await {
        Ok(analysis) => {
            let text = render::signal_message(&analysis, &state.config.pairs);
            reply(state, OutgoingMessage::markdown(chat_id, text)).await;
            state.record_signal();
            true
        }
        Err(e) => {
            warn!(chat_id, symbol, %timeframe, error = %e, "signal unavailable");
            reply(state, OutgoingMessage::markdown(chat_id, render::unavailable(&e))).await;
            state.record_failure();
            false
        }
    }
}

async fn reply(state: &AppState, message: OutgoingMessage) {
    let chat_id = message.chat_id;
    if let Err(e) = state.sender.send(message).await {
        warn!(chat_id, error = %e, "failed to send reply");
    }
}
