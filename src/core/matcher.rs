//! Resolves free-text fragments to catalog products.
//!
//! A product matches a query when, after compact normalization, its name
//! contains the query, the query contains its name, or their Levenshtein
//! similarity exceeds the configured threshold. Results keep catalog order,
//! so `best_match` is the first matching product in catalog iteration order
//! and never a re-ranking by score.

use crate::core::normalizer::normalize_compact;
use crate::domain::model::Product;
use std::sync::Arc;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// `1 - distance / max(len)` over chars. Identical strings (including two empty ones) score 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    1.0 - (distance as f64 / max_len as f64)
}

#[derive(Debug, Clone)]
pub struct ProductMatcher {
    threshold: f64,
    suggestion_limit: usize,
}

impl Default for ProductMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_SUGGESTION_LIMIT)
    }
}

impl ProductMatcher {
    pub fn new(threshold: f64, suggestion_limit: usize) -> Self {
        Self {
            threshold,
            suggestion_limit,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn suggestion_limit(&self) -> usize {
        self.suggestion_limit
    }

    pub fn find_matches(&self, text: &str, catalog: &[Arc<Product>]) -> Vec<Arc<Product>> {
        let query = normalize_compact(text);
        if query.is_empty() {
            return Vec::new();
        }

        catalog
            .iter()
            .filter(|product| {
                let name = normalize_compact(product.name.as_str());
                !name.is_empty()
                    && (name.contains(&query)
                        || query.contains(&name)
                        || similarity(&name, &query) > self.threshold)
            })
            .cloned()
            .collect()
    }

    pub fn best_match(&self, text: &str, catalog: &[Arc<Product>]) -> Option<Arc<Product>> {
        self.find_matches(text, catalog).into_iter().next()
    }

    /// Did-you-mean candidates: names containing the fragment, capped at the suggestion limit.
    pub fn suggest_similar(&self, partial: &str, catalog: &[Arc<Product>]) -> Vec<Arc<Product>> {
        let query = normalize_compact(partial);
        if query.is_empty() {
            return Vec::new();
        }

        catalog
            .iter()
            .filter(|product| normalize_compact(product.name.as_str()).contains(&query))
            .take(self.suggestion_limit)
            .cloned()
            .collect()
    }
}
