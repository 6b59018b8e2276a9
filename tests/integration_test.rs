use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use garimpo::config::ScraperConfig;
use garimpo::engine::ScrapeEngine;
use garimpo::pacing::{Clock, SleepFn};
use garimpo::ScrapeError;

const SEARCH_PAGE: &str = r#"
<!DOCTYPE html>
<html>
  <body>
    <div class="sg-col-inner">
      <div data-component-type="s-search-result" class="s-result-item" data-asin="B0A">
        <h2><a href="/dp/B0A"><span>Smartphone Motorola Moto G84</span></a></h2>
        <span class="a-icon-alt">4,5 de 5 estrelas</span>
        <span class="a-size-base">2.718 avaliações</span>
        <img class="s-image" src="https://m.media-amazon.com/images/I/moto-g84.jpg">
        <span class="a-price"><span class="a-offscreen">R$ 1.299,00</span></span>
      </div>
      <div data-component-type="s-search-result" class="s-result-item" data-asin="B0B">
        <h2><a href="/dp/B0B"><span>Capa para celular</span></a></h2>
        <img class="s-image" src="https://m.media-amazon.com/images/I/capa.jpg">
        <span class="a-price-symbol">R$</span>
        <span class="a-price-whole">29</span>
      </div>
      <div data-component-type="s-search-result" class="s-result-item" data-asin="">
        <span>sponsored placeholder without title or image</span>
      </div>
    </div>
  </body>
</html>
"#;

struct TestClock(AtomicU64);

impl Clock for TestClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn test_config(base_url: String) -> ScraperConfig {
    ScraperConfig {
        base_url,
        jitter_min_ms: 0,
        jitter_max_ms: 0,
        ..ScraperConfig::default()
    }
}

fn recording_sleep(slept: Arc<Mutex<Vec<u64>>>) -> SleepFn {
    Arc::new(move |duration| {
        slept.lock().unwrap().push(duration.as_millis() as u64);
        Box::pin(async {})
    })
}

fn test_engine(base_url: String, slept: Arc<Mutex<Vec<u64>>>) -> ScrapeEngine {
    ScrapeEngine::with_timing(
        test_config(base_url),
        Arc::new(TestClock(AtomicU64::new(0))),
        recording_sleep(slept),
    )
    .unwrap()
}

#[tokio::test]
async fn envelope_holds_the_extracted_products() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .with_body(SEARCH_PAGE)
        .create_async()
        .await;

    let engine = test_engine(server.url(), Arc::new(Mutex::new(Vec::new())));
    let response = engine.scrape_products("moto g84").await.unwrap();

    assert!(response.success);
    assert!(!response.cached);
    assert_eq!(response.keyword, "moto g84");
    assert_eq!(response.total_products, response.products.len());
    // The placeholder listing has neither title nor image and must be dropped.
    assert_eq!(response.total_products, 2);
    for product in &response.products {
        assert!(!product.title.is_empty());
        assert!(product.image_url.starts_with("http"));
    }

    let phone = &response.products[0];
    assert_eq!(phone.title, "Smartphone Motorola Moto G84");
    assert_eq!(phone.rating, Some(4.5));
    assert_eq!(phone.review_count, Some(2_718));
    assert_eq!(phone.price, "R$ 1.299,00");

    let case = &response.products[1];
    assert_eq!(case.rating, None);
    assert_eq!(case.review_count, None);
    assert_eq!(case.price, "R$ 29,00");
}

#[tokio::test]
async fn second_call_within_the_freshness_window_hits_the_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .with_body(SEARCH_PAGE)
        .expect(1)
        .create_async()
        .await;

    let engine = test_engine(server.url(), Arc::new(Mutex::new(Vec::new())));

    let first = engine.scrape_products("phone").await.unwrap();
    let second = engine.scrape_products("phone").await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.total_products, first.total_products);
    mock.assert_async().await;
}

#[tokio::test]
async fn keyword_case_and_whitespace_variants_share_the_cache_entry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .with_body(SEARCH_PAGE)
        .expect(1)
        .create_async()
        .await;

    let engine = test_engine(server.url(), Arc::new(Mutex::new(Vec::new())));

    let first = engine.scrape_products("Phone").await.unwrap();
    let second = engine.scrape_products("  phone  ").await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    mock.assert_async().await;
}

#[tokio::test]
async fn invalid_keywords_fail_before_any_network_activity() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let engine = test_engine(server.url(), Arc::new(Mutex::new(Vec::new())));

    assert!(matches!(
        engine.scrape_products("").await,
        Err(ScrapeError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.scrape_products(&"x".repeat(101)).await,
        Err(ScrapeError::InvalidInput(_))
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn consecutive_fetches_wait_out_the_minimum_spacing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .with_body(SEARCH_PAGE)
        .expect(2)
        .create_async()
        .await;

    let slept = Arc::new(Mutex::new(Vec::new()));
    let engine = test_engine(server.url(), slept.clone());

    // Two distinct keywords, both cache misses. The clock never advances, so
    // the second fetch has to sleep out the entire spacing window.
    engine.scrape_products("phone").await.unwrap();
    assert!(slept.lock().unwrap().is_empty());

    engine.scrape_products("tablet").await.unwrap();
    assert_eq!(*slept.lock().unwrap(), vec![10_000]);
}

#[tokio::test]
async fn temporary_block_status_maps_to_blocked() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let engine = test_engine(server.url(), Arc::new(Mutex::new(Vec::new())));

    assert!(matches!(
        engine.scrape_products("phone").await,
        Err(ScrapeError::Blocked)
    ));
}

#[tokio::test]
async fn too_many_requests_status_maps_to_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let engine = test_engine(server.url(), Arc::new(Mutex::new(Vec::new())));

    assert!(matches!(
        engine.scrape_products("phone").await,
        Err(ScrapeError::RateLimited)
    ));
}

#[tokio::test]
async fn statuses_below_500_are_inspected_not_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .with_body(SEARCH_PAGE)
        .create_async()
        .await;

    let engine = test_engine(server.url(), Arc::new(Mutex::new(Vec::new())));
    let response = engine.scrape_products("phone").await.unwrap();

    assert_eq!(response.total_products, 2);
}

#[tokio::test]
async fn failed_fetches_still_consume_rate_budget() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/s")
        .match_query(mockito::Matcher::Any)
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let slept = Arc::new(Mutex::new(Vec::new()));
    let engine = test_engine(server.url(), slept.clone());

    assert!(engine.scrape_products("phone").await.is_err());
    assert!(engine.scrape_products("tablet").await.is_err());

    // The second attempt had to wait even though the first one failed.
    assert_eq!(*slept.lock().unwrap(), vec![10_000]);
}

#[tokio::test]
async fn connection_refused_maps_to_unreachable() {
    // Nothing listens on the discard port.
    let engine = test_engine(
        "http://127.0.0.1:9".to_string(),
        Arc::new(Mutex::new(Vec::new())),
    );

    assert!(matches!(
        engine.scrape_products("phone").await,
        Err(ScrapeError::Unreachable(_))
    ));
}
