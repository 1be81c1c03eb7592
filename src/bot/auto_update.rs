// =============================================================================
// Scheduled signals for subscribed chats
// =============================================================================

use std::sync::Arc;

use tracing::{debug, info};

use super::handler::send_signal;
use crate::app_state::AppState;

/// One pass over every subscription.  Returns how many signals were computed.
pub async fn run_once(state: &Arc<AppState>) -> usize {
    let subs = state.subscriptions.snapshot();
    if subs.is_empty() {
        debug!("no auto-update subscriptions");
        return 0;
    }

    let mut delivered = 0;
    for (chat_id, sub) in &subs {
        if send_signal(state, *chat_id, &sub.symbol, sub.timeframe).await {
            delivered += 1;
        }
    }
    info!(subscriptions = subs.len(), delivered, "auto-update pass complete");
    delivered
}

/// Run `run_once` every `auto_update_interval_secs`, first tick one interval
/// after startup.
pub async fn run_auto_updates(state: Arc<AppState>) {
    let every = tokio::time::Duration::from_secs(state.config.auto_update_interval_secs.max(1));
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        run_once(&state).await;
    }
}
