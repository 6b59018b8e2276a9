use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The `ScraperConfig` struct holds the configuration settings for the scraper.
/// It includes the target endpoint, timeouts, request pacing and cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Base URL of the target store, without a trailing slash.
    pub base_url: String,
    /// The overall timeout applied to each search-page request.
    pub fetch_timeout: Duration,
    /// How many redirects a request is allowed to follow.
    pub max_redirects: usize,
    /// Minimum spacing enforced between two outbound fetches.
    pub min_request_spacing: Duration,
    /// Lower bound of the randomized pre-request delay, in milliseconds.
    pub jitter_min_ms: u64,
    /// Upper bound (exclusive) of the randomized pre-request delay, in milliseconds.
    pub jitter_max_ms: u64,
    /// How long a cached search page stays fresh.
    pub cache_freshness: Duration,
    /// Longest keyword accepted, in characters, after trimming.
    pub max_keyword_length: usize,
}

impl Default for ScraperConfig {
    /// Provides default values for the `ScraperConfig` struct.
    ///
    /// # Returns
    ///
    /// A `ScraperConfig` instance tuned for amazon.com.br.
    fn default() -> Self {
        Self {
            base_url: String::from("https://www.amazon.com.br"),
            fetch_timeout: crate::FETCH_TIMEOUT,
            max_redirects: 5,
            min_request_spacing: crate::MIN_REQUEST_SPACING,
            jitter_min_ms: 2_000,
            jitter_max_ms: 5_000,
            cache_freshness: crate::CACHE_FRESHNESS_WINDOW,
            max_keyword_length: crate::MAX_KEYWORD_LENGTH,
        }
    }
}
