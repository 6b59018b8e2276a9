use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;

use garimpo::{Result, ScrapeEngine, ScraperConfig};

/// The main entry point of the application.
///
/// Plays the role of the dispatch layer: takes the keyword from the command
/// line, runs one scrape and prints the result envelope as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ScraperConfig::default();

    let keyword = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "notebook".to_string());

    let start_time = Instant::now();
    let engine = ScrapeEngine::new(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message(format!("Scraping Amazon for '{}'...", keyword));
    spinner.enable_steady_tick(Duration::from_millis(100));

    match engine.scrape_products(&keyword).await {
        Ok(response) => {
            spinner.finish_with_message(format!(
                "Found {} products in {:.2?}",
                response.total_products,
                start_time.elapsed()
            ));
            println!(
                "{}",
                serde_json::to_string_pretty(&response).unwrap_or_default()
            );
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Scraping failed: {}", e);
            Err(e)
        }
    }
}
