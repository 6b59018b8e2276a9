use scraper::{Html, Selector};
use tracing::debug;

use crate::extract::ProductExtractor;
use crate::types::Product;

/// Locates the listing elements of a search-results page and runs the field
/// extractors over each of them.
///
/// Container strategies are ordered from the most specific structural marker
/// to progressively looser fallbacks. The first strategy matching at least
/// one element wins outright; matches are never merged across strategies.
pub struct PageScanner {
    container_selectors: Vec<Selector>,
    extractor: ProductExtractor,
}

const CONTAINER_SELECTORS: [&str; 3] = [
    "[data-component-type=\"s-search-result\"]",
    ".s-result-item[data-asin]",
    ".sg-col-inner .s-result-item",
];

impl Default for PageScanner {
    fn default() -> Self {
        Self {
            container_selectors: CONTAINER_SELECTORS
                .iter()
                .filter_map(|pattern| Selector::parse(pattern).ok())
                .collect(),
            extractor: ProductExtractor::default(),
        }
    }
}

impl PageScanner {
    /// Returns the valid product records of `document`, in document order.
    /// An empty vector means no container strategy matched anything.
    pub fn scan(&self, document: &Html) -> Vec<Product> {
        for selector in &self.container_selectors {
            let listings: Vec<_> = document.select(selector).collect();
            if listings.is_empty() {
                continue;
            }

            debug!(listings = listings.len(), "container strategy matched");
            return listings
                .into_iter()
                .filter_map(|listing| self.extractor.extract_product(&listing))
                .collect();
        }

        debug!("no container strategy matched the document");
        Vec::new()
    }
}
