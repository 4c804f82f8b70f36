//! Product data as returned by the OpenFoodFacts API.

use serde::{Deserialize, Serialize};

/// Read-only snapshot of a product fetched from the food database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Display name of the product
    #[serde(rename = "product_name", default)]
    pub name: Option<String>,
    /// Primary ingredient list, in whatever language the product was entered
    #[serde(default)]
    pub ingredients_text: Option<String>,
    /// English ingredient list, used when the primary one is missing
    #[serde(default)]
    pub ingredients_text_en: Option<String>,
    /// Barcode (UPC, EAN, ...)
    #[serde(rename = "code", default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductRecord {
    /// Create a record with only a name and a primary ingredient list
    pub fn new(name: impl Into<String>, ingredients_text: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ingredients_text: Some(ingredients_text.into()),
            ..Self::default()
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_english_ingredients(mut self, ingredients_text_en: impl Into<String>) -> Self {
        self.ingredients_text_en = Some(ingredients_text_en.into());
        self
    }
}

/// Envelope returned by `GET /api/v0/product/{barcode}.json`
#[derive(Debug, Clone, Deserialize)]
pub struct OpenFoodFactsResponse {
    /// 1 when the product exists, 0 otherwise
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub status_verbose: String,
    #[serde(default)]
    pub product: Option<ProductRecord>,
    #[serde(default)]
    pub code: Option<String>,
}

impl OpenFoodFactsResponse {
    /// Turn the envelope into a product, or `None` for "product not found"
    ///
    /// The product's barcode falls back to the envelope code, then to the
    /// barcode that was requested.
    pub fn into_product(self, requested_barcode: &str) -> Option<ProductRecord> {
        if self.status == 0 {
            return None;
        }
        let code = self.code;
        self.product.map(|mut product| {
            if product.barcode.as_deref().is_none_or(str::is_empty) {
                product.barcode = code
                    .filter(|c| !c.is_empty())
                    .or_else(|| Some(requested_barcode.to_string()));
            }
            product
        })
    }
}
