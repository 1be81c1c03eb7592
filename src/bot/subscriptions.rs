// =============================================================================
// Auto-update subscriptions, keyed by chat id
// =============================================================================
//
// One entry per chat: created by /auto, replaced by a later /auto, removed by
// /stop.  Held in memory only; a restart clears it.
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::Timeframe;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SubscriptionStore {
    inner: RwLock<HashMap<i64, Subscription>>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `chat_id`, returning the entry it replaced.
    pub fn subscribe(&self, chat_id: i64, symbol: impl Into<String>, timeframe: Timeframe) -> Option<Subscription> {
        let sub = Subscription {
            symbol: symbol.into(),
            timeframe,
            created_at: Utc::now(),
        };
        self.inner.write().insert(chat_id, sub)
    }

    pub fn unsubscribe(&self, chat_id: i64) -> Option<Subscription> {
        self.inner.write().remove(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Copy of every entry, ordered by chat id, so callers never hold the lock
    /// across an await.
    pub fn snapshot(&self) -> Vec<(i64, Subscription)> {
        let mut entries: Vec<_> = self
            .inner
            .read()
            .iter()
            .map(|(id, sub)| (*id, sub.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}
