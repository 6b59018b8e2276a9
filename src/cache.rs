use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::pacing::Clock;
use crate::types::CacheStats;

struct CacheEntry {
    body: String,
    stored_at: u64,
}

/// In-memory cache of raw search pages, keyed by normalized keyword.
///
/// An entry is fresh while it is younger than the freshness window. Stale
/// entries are never actively evicted; they are overwritten by the next store
/// for the same key. Distinct keywords therefore accumulate for the lifetime
/// of the process; `clear` is the relief valve if that ever matters.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    freshness: Duration,
    clock: Arc<dyn Clock>,
}

/// Case-folds and trims a keyword so whitespace and case variants share one
/// cache entry.
pub fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

impl ResponseCache {
    pub fn new(freshness: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            freshness,
            clock,
        }
    }

    /// Returns the stored page for `keyword` while the entry is still fresh.
    pub async fn get(&self, keyword: &str) -> Option<String> {
        let key = normalize_keyword(keyword);
        let entries = self.entries.lock().await;
        let entry = entries.get(&key)?;

        let age = self.clock.now_millis().saturating_sub(entry.stored_at);
        if age < self.freshness.as_millis() as u64 {
            debug!(keyword = %key, age_secs = age / 1000, "cache hit");
            Some(entry.body.clone())
        } else {
            debug!(keyword = %key, age_secs = age / 1000, "cache entry stale");
            None
        }
    }

    /// Stores `body` under the normalized keyword, overwriting any prior
    /// entry and restarting its freshness window.
    pub async fn put(&self, keyword: &str, body: String) {
        let key = normalize_keyword(keyword);
        let entry = CacheEntry {
            body,
            stored_at: self.clock.now_millis(),
        };
        self.entries.lock().await.insert(key, entry);
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let now = self.clock.now_millis();
        let window = self.freshness.as_millis() as u64;
        let entries = self.entries.lock().await;

        CacheStats {
            total_entries: entries.len(),
            fresh_entries: entries
                .values()
                .filter(|entry| now.saturating_sub(entry.stored_at) < window)
                .count(),
        }
    }
}
