use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::warn;

use crate::types::Product;

/// The `ProductExtractor` struct pulls the individual fields of a product out
/// of one listing element. Amazon renders the same field under several
/// different class names depending on the result layout, so every field runs
/// an ordered list of selector strategies and the first one producing a valid
/// value wins.
pub struct ProductExtractor {
    title_selectors: Vec<Selector>,
    rating_selectors: Vec<Selector>,
    review_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
    price_full_selectors: Vec<Selector>,
    price_whole: Option<Selector>,
    price_fraction: Option<Selector>,
    price_symbol: Option<Selector>,
    price_fallback_selectors: Vec<Selector>,
    number_pattern: Option<Regex>,
    review_pattern: Option<Regex>,
    currency_pattern: Option<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .filter_map(|pattern| Selector::parse(pattern).ok())
        .collect()
}

impl Default for ProductExtractor {
    fn default() -> Self {
        Self {
            title_selectors: compile(&[
                "h2 a span",
                ".s-size-mini span",
                "[data-cy=\"title-recipe-title\"] span",
                ".a-text-normal",
            ]),
            rating_selectors: compile(&[
                ".a-icon-alt",
                "[aria-label*=\"stars\"]",
                ".a-star-medium .a-icon-alt",
            ]),
            review_selectors: compile(&[".a-size-base", "[aria-label*=\"reviews\"]", ".a-link-normal"]),
            image_selectors: compile(&[".s-image", "img[data-image-latency]", ".a-dynamic-image"]),
            price_full_selectors: compile(&[
                ".a-price .a-offscreen",
                ".a-price-whole",
                ".a-text-price .a-offscreen",
                ".a-color-price .a-offscreen",
            ]),
            price_whole: Selector::parse(".a-price-whole").ok(),
            price_fraction: Selector::parse(".a-price-fraction").ok(),
            price_symbol: Selector::parse(".a-price-symbol").ok(),
            price_fallback_selectors: compile(&[
                ".a-price",
                ".a-text-price",
                ".a-color-price",
                "[data-a-color=\"price\"]",
            ]),
            number_pattern: Regex::new(r"(\d+[,.]?\d*)").ok(),
            review_pattern: Regex::new(r"([\d.,]+)").ok(),
            currency_pattern: Regex::new(r"[R$\s]*[\d,.]+").ok(),
        }
    }
}

impl ProductExtractor {
    /// Builds one `Product` from a listing element, or `None` when the
    /// listing fails the validity invariant (non-empty title and image URL).
    /// A dropped listing never aborts the scan of its siblings.
    pub fn extract_product(&self, listing: &ElementRef) -> Option<Product> {
        let title = self.extract_title(listing).unwrap_or_default();
        let image_url = self.extract_image_url(listing).unwrap_or_default();

        if title.is_empty() || image_url.is_empty() {
            warn!("listing skipped: missing title or image URL");
            return None;
        }

        Some(Product {
            title,
            rating: self.extract_rating(listing),
            review_count: self.extract_review_count(listing),
            image_url,
            price: self.extract_price(listing),
        })
    }

    /// First non-empty trimmed text among the title candidates.
    pub fn extract_title(&self, listing: &ElementRef) -> Option<String> {
        for selector in &self.title_selectors {
            if let Some(element) = listing.select(selector).next() {
                let text = element.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    /// First candidate whose `aria-label` or text carries a decimal number in
    /// `[0, 5]`. The pt-BR decimal comma is normalized before parsing, so
    /// `"4,5 de 5 estrelas"` yields `4.5`.
    pub fn extract_rating(&self, listing: &ElementRef) -> Option<f64> {
        let pattern = self.number_pattern.as_ref()?;

        for selector in &self.rating_selectors {
            if let Some(element) = listing.select(selector).next() {
                let text = element
                    .value()
                    .attr("aria-label")
                    .map(str::to_string)
                    .unwrap_or_else(|| element.text().collect());

                if let Some(captures) = pattern.captures(&text) {
                    if let Ok(rating) = captures[1].replace(',', ".").parse::<f64>() {
                        if (0.0..=5.0).contains(&rating) {
                            return Some(rating);
                        }
                    }
                }
            }
        }
        None
    }

    /// Scans every match of the review candidates, keeps only text carrying
    /// the pt-BR review token ("avaliações" and friends), and parses the
    /// first integer-like run with every thousands separator stripped, so
    /// multi-separator counts like `"1.234.567"` survive intact.
    pub fn extract_review_count(&self, listing: &ElementRef) -> Option<u64> {
        let pattern = self.review_pattern.as_ref()?;

        for selector in &self.review_selectors {
            for element in listing.select(selector) {
                let text = element.text().collect::<String>();
                if !text.to_lowercase().contains("avalia") {
                    continue;
                }
                if let Some(captures) = pattern.captures(&text) {
                    if let Ok(count) = captures[1].replace([',', '.'], "").parse::<u64>() {
                        return Some(count);
                    }
                }
            }
        }
        None
    }

    /// First image candidate exposing an absolute `src` (or lazy-loaded
    /// `data-src`) URL.
    pub fn extract_image_url(&self, listing: &ElementRef) -> Option<String> {
        for selector in &self.image_selectors {
            if let Some(element) = listing.select(selector).next() {
                let src = element
                    .value()
                    .attr("src")
                    .or_else(|| element.value().attr("data-src"));

                if let Some(src) = src {
                    if src.starts_with("http") {
                        return Some(src.to_string());
                    }
                }
            }
        }
        None
    }

    /// Four-tier price fallback. Amazon renders a price either as one opaque
    /// string or as split symbol/whole/fraction fragments, inconsistently:
    ///
    /// 1. an element already holding a fully formatted amount is returned
    ///    verbatim (it must contain a decimal or thousands separator);
    /// 2. otherwise the price is assembled from the split fragments, with
    ///    the cents defaulted to `"00"` when missing;
    /// 3. otherwise a looser container is searched for a currency-looking
    ///    substring;
    /// 4. otherwise the price is the empty string.
    pub fn extract_price(&self, listing: &ElementRef) -> String {
        for selector in &self.price_full_selectors {
            if let Some(element) = listing.select(selector).next() {
                let text = element.text().collect::<String>().trim().to_string();
                if !text.is_empty() && (text.contains(',') || text.contains('.')) {
                    return text;
                }
            }
        }

        if let Some(whole) = self.fragment_text(listing, &self.price_whole) {
            let mut price = String::new();
            if let Some(symbol) = self.fragment_text(listing, &self.price_symbol) {
                price.push_str(&symbol);
                price.push(' ');
            }
            price.push_str(&whole);
            match self.fragment_text(listing, &self.price_fraction) {
                Some(fraction) => {
                    price.push(',');
                    price.push_str(&fraction);
                }
                None => price.push_str(",00"),
            }
            return price;
        }

        if let Some(pattern) = &self.currency_pattern {
            for selector in &self.price_fallback_selectors {
                if let Some(element) = listing.select(selector).next() {
                    let text = element.text().collect::<String>();
                    if let Some(amount) = pattern.find(text.trim()) {
                        return amount.as_str().trim().to_string();
                    }
                }
            }
        }

        String::new()
    }

    fn fragment_text(&self, listing: &ElementRef, selector: &Option<Selector>) -> Option<String> {
        let element = listing.select(selector.as_ref()?).next()?;
        let text = element.text().collect::<String>().trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}
