//! Pulls `(quantity, item)` pairs out of an ordering message.
//!
//! The primary pattern wants an ordering phrase in front of the quantity
//! (`cho tôi 2 cà phê đen`). Only when it yields nothing does the permissive
//! pattern run, which accepts a bare `<number> <item>`. Each item span ends
//! at a conjunction, a comma or the end of the message and is resolved
//! against the catalog through [`ProductMatcher`]; spans that resolve to
//! nothing are dropped.

use crate::core::matcher::ProductMatcher;
use crate::core::normalizer::normalize;
use crate::domain::model::{ExtractedItem, Product};
use crate::utils::error::{OrderChatError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Phrase vocabularies for extraction, the `[extraction]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    pub order_phrases: Vec<String>,
    pub conjunctions: Vec<String>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            order_phrases: ["cho tôi", "tôi muốn", "lấy", "mua", "đặt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            conjunctions: vec!["và".to_string()],
        }
    }
}

/// One item span as written by the customer, before catalog resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSpan {
    pub quantity: u32,
    pub text: String,
    pub note: Option<String>,
}

/// Resolved items plus the spans that matched no product.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub items: Vec<ExtractedItem>,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OrderExtractor {
    primary: Regex,
    fallback: Regex,
    matcher: ProductMatcher,
}

/// Regex alternation over `phrases`, accepting each phrase as written and
/// diacritic-folded, with any run of whitespace between words. Longest first.
fn alternation(phrases: &[String]) -> String {
    let mut variants: Vec<String> = phrases
        .iter()
        .flat_map(|p| [p.trim().to_string(), normalize(p.as_str())])
        .filter(|p| !p.is_empty())
        .collect();
    variants.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    variants.dedup();

    variants
        .iter()
        .map(|p| {
            p.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| OrderChatError::ConfigError {
        message: format!("Invalid extraction pattern: {}", e),
    })
}

impl OrderExtractor {
    pub fn new(rules: &ExtractionRules, matcher: ProductMatcher) -> Result<Self> {
        let conjunctions = alternation(&rules.conjunctions);
        let terminator = if conjunctions.is_empty() {
            r"(?:\s*,|$)".to_string()
        } else {
            format!(r"(?:\s+(?:{})\b|\s*,|$)", conjunctions)
        };

        let phrases = alternation(&rules.order_phrases);
        if phrases.is_empty() {
            return Err(OrderChatError::MissingConfigError {
                field: "extraction.order_phrases".to_string(),
            });
        }

        let primary = compile(&format!(
            r"(?i)(?:{})\s*([0-9]+)\s+(.+?){}",
            phrases, terminator
        ))?;
        let fallback = compile(&format!(r"(?i)([0-9]+)\s+(.+?){}", terminator))?;

        Ok(Self {
            primary,
            fallback,
            matcher,
        })
    }

    pub fn matcher(&self) -> &ProductMatcher {
        &self.matcher
    }

    pub fn extract(&self, message: &str, catalog: &[Arc<Product>]) -> Vec<ExtractedItem> {
        self.extract_detailed(message, catalog).items
    }

    /// Like [`extract`](Self::extract), also reporting spans no product matched.
    pub fn extract_detailed(&self, message: &str, catalog: &[Arc<Product>]) -> Extraction {
        let mut extraction = self.resolve(spans(&self.primary, message), catalog);
        if extraction.items.is_empty() {
            let fallback = self.resolve(spans(&self.fallback, message), catalog);
            extraction.items = fallback.items;
            for text in fallback.unresolved {
                if !extraction.unresolved.contains(&text) {
                    extraction.unresolved.push(text);
                }
            }
        }
        extraction
    }

    /// Item spans the primary pattern finds, or the permissive ones when it finds none.
    #[cfg(test)]
    fn candidate_spans(&self, message: &str) -> Vec<ItemSpan> {
        let primary = spans(&self.primary, message);
        if primary.is_empty() {
            spans(&self.fallback, message)
        } else {
            primary
        }
    }

    fn resolve(&self, spans: Vec<ItemSpan>, catalog: &[Arc<Product>]) -> Extraction {
        let mut extraction = Extraction::default();
        for span in spans {
            match self.matcher.best_match(&span.text, catalog) {
                Some(product) => extraction.items.push(ExtractedItem {
                    product,
                    quantity: span.quantity,
                    note: span.note,
                }),
                None => {
                    tracing::debug!("🔍 No product for '{}'", span.text);
                    extraction.unresolved.push(span.text);
                }
            }
        }
        extraction
    }
}

fn spans(pattern: &Regex, message: &str) -> Vec<ItemSpan> {
    pattern
        .captures_iter(message)
        .filter_map(|caps| {
            let quantity = match caps[1].parse::<u32>() {
                Ok(q) => q,
                Err(_) => {
                    tracing::debug!("⚠️ Skipping unparseable quantity '{}'", &caps[1]);
                    return None;
                }
            };
            let (text, note) = split_note(caps[2].trim());
            if text.is_empty() {
                return None;
            }
            Some(ItemSpan {
                quantity,
                text,
                note,
            })
        })
        .collect()
}

/// `"cà phê đen (ít đá)"` -> (`"cà phê đen"`, `Some("ít đá")`).
fn split_note(span: &str) -> (String, Option<String>) {
    let Some(inner) = span.strip_suffix(')') else {
        return (span.to_string(), None);
    };
    match inner.rfind('(') {
        Some(open) if !inner[open + 1..].contains(')') => {
            let note = inner[open + 1..].trim();
            (
                inner[..open].trim().to_string(),
                (!note.is_empty()).then(|| note.to_string()),
            )
        }
        _ => (span.to_string(), None),
    }
}
