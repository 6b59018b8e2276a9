use std::sync::Arc;

use scraper::Html;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::cache::ResponseCache;
use crate::config::ScraperConfig;
use crate::fetch::FetchGateway;
use crate::pacing::{tokio_sleep, Clock, RateLimiter, SleepFn, SystemClock};
use crate::scan::PageScanner;
use crate::types::{CacheStats, ScrapeResponse};
use crate::{Result, ScrapeError};

/// The `ScrapeEngine` composes cache, rate limiter, fetch gateway and page
/// scanner into the one operation exposed to the dispatch layer:
/// [`ScrapeEngine::scrape_products`].
pub struct ScrapeEngine {
    config: ScraperConfig,
    cache: ResponseCache,
    limiter: RateLimiter,
    gateway: FetchGateway,
    scanner: PageScanner,
    /// Serializes cache-miss fetches so concurrent calls cannot race past the
    /// spacing check and fire two requests inside one spacing window.
    fetch_lock: Mutex<()>,
}

impl ScrapeEngine {
    /// Creates an engine on the system clock and the tokio timer.
    pub fn new(config: ScraperConfig) -> Result<Self> {
        Self::with_timing(config, Arc::new(SystemClock), tokio_sleep())
    }

    /// Creates an engine with an injected clock and sleeper, so tests can
    /// drive time without wall-clock waits.
    pub fn with_timing(
        config: ScraperConfig,
        clock: Arc<dyn Clock>,
        sleep: SleepFn,
    ) -> Result<Self> {
        Ok(Self {
            cache: ResponseCache::new(config.cache_freshness, clock.clone()),
            limiter: RateLimiter::new(config.min_request_spacing, clock, sleep.clone()),
            gateway: FetchGateway::new(&config, sleep)?,
            scanner: PageScanner::default(),
            fetch_lock: Mutex::new(()),
            config,
        })
    }

    /// Scrapes the search results for `keyword` and returns the result
    /// envelope. The page comes from the response cache when a fresh entry
    /// exists; otherwise one rate-limited fetch is performed and cached.
    /// Fetch failures propagate unchanged; no retry happens here.
    #[instrument(skip(self))]
    pub async fn scrape_products(&self, keyword: &str) -> Result<ScrapeResponse> {
        let trimmed = self.validate_keyword(keyword)?;

        let stats = self.cache.stats().await;
        debug!(
            fresh = stats.fresh_entries,
            total = stats.total_entries,
            since_last_request_ms = self.limiter.millis_since_last().await,
            "starting scrape"
        );

        let (body, cached) = match self.cache.get(trimmed).await {
            Some(body) => (body, true),
            None => self.fetch_and_store(trimmed).await?,
        };

        let document = Html::parse_document(&body);
        let products = self.scanner.scan(&document);
        debug!(count = products.len(), cached, "scrape finished");

        Ok(ScrapeResponse {
            success: true,
            keyword: keyword.to_string(),
            total_products: products.len(),
            products,
            scraped_at: chrono::Utc::now(),
            cached,
        })
    }

    /// Performs the rate-limited fetch for a cache miss and stores the page.
    /// Returns the body plus whether it was ultimately served from cache (a
    /// concurrent call may have filled the entry while we waited for the
    /// fetch lock).
    async fn fetch_and_store(&self, keyword: &str) -> Result<(String, bool)> {
        let _guard = self.fetch_lock.lock().await;

        if let Some(body) = self.cache.get(keyword).await {
            return Ok((body, true));
        }

        self.limiter.acquire().await;
        let fetched = self.gateway.fetch_search_page(keyword).await;
        self.limiter.record().await;

        let body = fetched?;
        self.cache.put(keyword, body.clone()).await;
        Ok((body, false))
    }

    fn validate_keyword<'a>(&self, keyword: &'a str) -> Result<&'a str> {
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            return Err(ScrapeError::InvalidInput(
                "keyword must be a non-empty string".to_string(),
            ));
        }
        if trimmed.chars().count() > self.config.max_keyword_length {
            return Err(ScrapeError::InvalidInput(format!(
                "keyword must be at most {} characters",
                self.config.max_keyword_length
            )));
        }
        Ok(trimmed)
    }

    /// Snapshot of the response cache, mirrored into the scrape logs.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drops every cached page.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
