// =============================================================================
// Long-poll loop (used when no webhook URL is configured)
// =============================================================================

use std::sync::Arc;

use tracing::{error, info};

use super::handler::handle_update;
use crate::app_state::AppState;
use crate::telegram::{TelegramClient, Update};

/// Server-side wait for each `getUpdates` call.
const LONG_POLL_SECS: u64 = 30;

/// Offset that acknowledges every update in `updates`.
pub fn next_offset(updates: &[Update], current: i64) -> i64 {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .fold(current, i64::max)
}

/// Poll forever.  Each update is handled on its own task; API errors back
/// off for 5 s and retry with the same offset.
pub async fn run_polling(client: Arc<TelegramClient>, state: Arc<AppState>) {
    info!("long polling started");
    let mut offset = 0_i64;
    loop {
        match client.get_updates(offset, LONG_POLL_SECS).await {
            Ok(updates) => {
                offset = next_offset(&updates, offset);
                for update in updates {
                    let state = state.clone();
                    tokio::spawn(async move {
                        handle_update(&state, update).await;
                    });
                }
            }
            Err(e) => {
                error!(error = %e, "getUpdates failed, retrying in 5s");
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
            }
        }
    }
}
