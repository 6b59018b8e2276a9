use std::time::Duration;
use thiserror::Error;

pub mod cache;
pub mod config;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod pacing;
pub mod scan;
pub mod types;

// Re-export commonly used types
pub use config::ScraperConfig;
pub use engine::ScrapeEngine;
pub use types::{Product, ScrapeResponse};

/// The `ScrapeError` enum represents the failure kinds a scrape can surface.
///
/// Extraction problems on individual listings are not represented here; a
/// malformed listing is logged and dropped without failing the scan.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The keyword was empty or too long; rejected before any network activity.
    #[error("invalid keyword: {0}")]
    InvalidInput(String),
    /// Amazon answered with a temporary-block status (503).
    #[error("Amazon temporarily blocked the request. Try again in a few minutes.")]
    Blocked,
    /// Amazon answered with a too-many-requests status (429).
    #[error("Too many requests. Wait a few minutes before trying again.")]
    RateLimited,
    /// The request timed out or the connection was refused.
    #[error("could not reach Amazon: {0}")]
    Unreachable(String),
    /// Any other transport or HTTP anomaly.
    #[error("failed to fetch search results: {0}")]
    FetchFailed(String),
}

/// A type alias for `Result` with the `ScrapeError` error type.
pub type Result<T> = std::result::Result<T, ScrapeError>;

// Constants

/// Minimum spacing enforced between two outbound fetches.
pub const MIN_REQUEST_SPACING: Duration = Duration::from_millis(10_000);
/// How long a cached search page stays fresh.
pub const CACHE_FRESHNESS_WINDOW: Duration = Duration::from_millis(300_000);
/// Overall timeout applied to the network call.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
/// Longest keyword accepted, in characters, after trimming.
pub const MAX_KEYWORD_LENGTH: usize = 100;
