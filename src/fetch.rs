use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::ScraperConfig;
use crate::pacing::SleepFn;
use crate::{Result, ScrapeError};

/// User-Agent pool rotated across requests so consecutive fetches do not
/// present one fingerprint.
const USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

/// Performs the outbound search-page request and classifies its failures.
///
/// The gateway never retries; one call means at most one physical request.
pub struct FetchGateway {
    client: Client,
    base_url: String,
    jitter_min_ms: u64,
    jitter_max_ms: u64,
    sleep: SleepFn,
}

impl FetchGateway {
    pub fn new(config: &ScraperConfig, sleep: SleepFn) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .build()
            .map_err(|e| ScrapeError::FetchFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            jitter_min_ms: config.jitter_min_ms,
            jitter_max_ms: config.jitter_max_ms,
            sleep,
        })
    }

    /// Fetches the raw search page for an already validated keyword.
    ///
    /// A randomized delay precedes the physical request so the inter-request
    /// cadence is not fixed. Statuses below 500 are passed through as normal
    /// responses; Amazon answers searches with redirects and the occasional
    /// 4xx, and those pages still have to be inspected.
    pub async fn fetch_search_page(&self, keyword: &str) -> Result<String> {
        let url = format!(
            "{}/s?k={}&ref=sr_pg_1",
            self.base_url,
            urlencoding::encode(keyword)
        );

        let jitter = self.jitter_millis();
        if jitter > 0 {
            debug!(jitter_ms = jitter, "adding human-like delay");
            (self.sleep)(Duration::from_millis(jitter)).await;
        }

        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        debug!(user_agent, url = %url, "sending search request");

        let response = self
            .client
            .get(&url)
            .header("User-Agent", user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8")
            .header("Accept-Language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7")
            .header("DNT", "1")
            .header("Connection", "keep-alive")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "same-origin")
            .header("Sec-Fetch-User", "?1")
            .header("Cache-Control", "max-age=0")
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        debug!(status = %status, "response received");

        match status {
            StatusCode::SERVICE_UNAVAILABLE => Err(ScrapeError::Blocked),
            StatusCode::TOO_MANY_REQUESTS => Err(ScrapeError::RateLimited),
            status if status.is_server_error() => Err(ScrapeError::FetchFailed(format!(
                "unexpected status {status}"
            ))),
            _ => response.text().await.map_err(classify_transport),
        }
    }

    fn jitter_millis(&self) -> u64 {
        if self.jitter_max_ms > self.jitter_min_ms {
            rand::thread_rng().gen_range(self.jitter_min_ms..self.jitter_max_ms)
        } else {
            self.jitter_min_ms
        }
    }
}

fn classify_transport(error: reqwest::Error) -> ScrapeError {
    if error.is_timeout() || error.is_connect() {
        ScrapeError::Unreachable(error.to_string())
    } else {
        ScrapeError::FetchFailed(error.to_string())
    }
}
