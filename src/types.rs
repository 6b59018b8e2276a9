use chrono::{DateTime, Utc};
use serde::Serialize;

/// One product listing extracted from a search-results page.
///
/// A record is only built when both `title` and `image_url` are non-empty;
/// listings failing that invariant are dropped before they reach the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// The product title, trimmed and non-empty.
    pub title: String,
    /// Star rating in `[0, 5]`, absent when no rating indicator was found.
    pub rating: Option<f64>,
    /// Number of customer reviews, absent when no review indicator was found.
    pub review_count: Option<u64>,
    /// Absolute URL of the product image.
    #[serde(rename = "imageURL")]
    pub image_url: String,
    /// Display price as rendered by the page, empty when none was found.
    pub price: String,
}

/// The envelope returned for one scrape invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse {
    pub success: bool,
    /// The keyword exactly as the caller passed it.
    pub keyword: String,
    /// Always equals `products.len()`.
    pub total_products: usize,
    /// Product records in document order.
    pub products: Vec<Product>,
    pub scraped_at: DateTime<Utc>,
    /// Whether the underlying page came from the response cache. Captured at
    /// lookup time, before the fetched page is stored.
    pub cached: bool,
}

/// A snapshot of the response cache, for logging and debugging.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Entries currently held, fresh or stale.
    pub total_entries: usize,
    /// Entries still inside the freshness window.
    pub fresh_entries: usize,
}
