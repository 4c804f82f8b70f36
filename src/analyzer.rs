//! # Ingredient Analyzer
//!
//! Checks a product's ingredient list against a user's blacklist and builds
//! the safety verdict shown to the user.
//!
//! Every function here is pure: no I/O, no shared state. They can be called
//! concurrently from any number of handlers.

use serde::Serialize;
use tracing::trace;

use crate::blacklist::BlacklistItem;
use crate::product::ProductRecord;
use crate::text_processing::matches;

/// Shown when a product has no ingredient text at all
pub const NO_INGREDIENTS_PLACEHOLDER: &str = "No ingredients listed";
/// Shown when a product has no name
pub const UNKNOWN_PRODUCT_PLACEHOLDER: &str = "Unknown Product";

/// Safety verdict for one product against one blacklist
///
/// Only [`analyze`] builds this type, so `is_safe` always equals
/// `matched_ingredients().is_empty()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    is_safe: bool,
    matched_ingredients: Vec<String>,
    full_ingredients_list: String,
    product_name: String,
    barcode: String,
}

impl AnalysisResult {
    pub fn is_safe(&self) -> bool {
        self.is_safe
    }

    /// Display names of matched blacklist items, in blacklist order
    pub fn matched_ingredients(&self) -> &[String] {
        &self.matched_ingredients
    }

    pub fn full_ingredients_list(&self) -> &str {
        &self.full_ingredients_list
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }
}

/// Extract ingredients text from product data
///
/// Returns the primary field if non-empty, otherwise the English field if
/// non-empty, otherwise an empty string. The chosen value is trimmed.
pub fn extract_ingredients(product: &ProductRecord) -> String {
    [&product.ingredients_text, &product.ingredients_text_en]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

/// Analyze a product's ingredients against the user's blacklist
///
/// Blacklist items are tested in order and the display name of every
/// matching item is kept, duplicates included.
pub fn analyze(product: &ProductRecord, blacklist: &[BlacklistItem]) -> AnalysisResult {
    let ingredients_text = extract_ingredients(product);

    let matched_ingredients: Vec<String> = blacklist
        .iter()
        .filter(|item| matches(&item.name, &ingredients_text))
        .map(|item| item.name.clone())
        .collect();

    trace!(
        blacklist_len = blacklist.len(),
        matched = matched_ingredients.len(),
        "Product analyzed"
    );

    let full_ingredients_list = if ingredients_text.is_empty() {
        NO_INGREDIENTS_PLACEHOLDER.to_string()
    } else {
        ingredients_text
    };

    let product_name = product
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_PRODUCT_PLACEHOLDER)
        .to_string();

    AnalysisResult {
        is_safe: matched_ingredients.is_empty(),
        matched_ingredients,
        full_ingredients_list,
        product_name,
        barcode: product.barcode.clone().unwrap_or_default(),
    }
}

/// Quick safety check without building the full result
///
/// Stops at the first blacklist match.
pub fn is_safe_quick(ingredients_text: &str, blacklist: &[BlacklistItem]) -> bool {
    !blacklist
        .iter()
        .any(|item| matches(&item.name, ingredients_text))
}
