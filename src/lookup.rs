//! # Product Lookup
//!
//! Fetches products by barcode from the OpenFoodFacts public API.
//!
//! A lookup has three outcomes: a product, "not found" (`Ok(None)`), or a
//! [`LookupError`]. Only the first one is ever handed to the analyzer.
//! There is no retry: a failed lookup is reported to the user who can
//! simply scan again.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info, warn, Instrument};

use crate::cache::ProductCache;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::LookupConfig;
use crate::errors::error_logging;
use crate::observability;
use crate::product::{OpenFoodFactsResponse, ProductRecord};

/// Why a lookup could not produce an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The request exceeded the configured timeout
    Timeout,
    /// Recent lookups kept failing; the circuit breaker is open
    Unavailable,
    /// The API answered with an error status or the request failed in transit
    Api(String),
    /// The API answered with a body that is not the expected JSON
    Decode(String),
}

impl LookupError {
    /// Localization key for the message shown to the user
    pub fn message_key(&self) -> &'static str {
        match self {
            LookupError::Timeout => "lookup-timeout",
            LookupError::Unavailable => "lookup-unavailable",
            LookupError::Api(_) => "lookup-api-error",
            LookupError::Decode(_) => "lookup-api-error",
        }
    }

    /// Metric label for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Timeout => "timeout",
            LookupError::Unavailable => "unavailable",
            LookupError::Api(_) => "api_error",
            LookupError::Decode(_) => "decode_error",
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Timeout => write!(f, "Request timed out. Please check your connection."),
            LookupError::Unavailable => {
                write!(f, "Product database is temporarily unavailable")
            }
            LookupError::Api(msg) => write!(f, "API Error: {}", msg),
            LookupError::Decode(msg) => write!(f, "Unexpected API response: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout
        } else if err.is_decode() {
            LookupError::Decode(err.to_string())
        } else {
            LookupError::Api(err.to_string())
        }
    }
}

/// Source of product records keyed by barcode
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// Fetch a product, returning `Ok(None)` when the barcode is unknown
    async fn fetch_product(&self, barcode: &str) -> Result<Option<ProductRecord>, LookupError>;
}

/// OpenFoodFacts API client with caching and a circuit breaker
#[derive(Debug)]
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
    cache: ProductCache,
    circuit_breaker: CircuitBreaker,
}

impl OpenFoodFactsClient {
    /// Build a client from configuration
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LookupError::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: ProductCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_max_entries,
            ),
            circuit_breaker: CircuitBreaker::from_config(config),
        })
    }

    /// URL of the product endpoint for a barcode
    pub fn product_url(&self, barcode: &str) -> String {
        format!("{}/{}.json", self.base_url, barcode)
    }

    pub fn cache(&self) -> &ProductCache {
        &self.cache
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    async fn request_product(&self, barcode: &str) -> Result<Option<ProductRecord>, LookupError> {
        let url = self.product_url(barcode);
        debug!(url = %url, "Requesting product");

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Api(format!("HTTP status {}", status)));
        }

        let body = response.text().await?;
        let envelope: OpenFoodFactsResponse =
            serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))?;

        if envelope.product.is_none() || envelope.status == 0 {
            info!(barcode = %barcode, status_verbose = %envelope.status_verbose, "Product not found in OpenFoodFacts database");
        }
        Ok(envelope.into_product(barcode))
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn fetch_product(&self, barcode: &str) -> Result<Option<ProductRecord>, LookupError> {
        if let Some(product) = self.cache.get(barcode) {
            debug!(barcode = %barcode, "Product served from cache");
            observability::record_lookup_metrics("cache_hit", Duration::ZERO);
            return Ok(Some(product));
        }

        if self.circuit_breaker.is_open() {
            warn!(barcode = %barcode, "Circuit breaker open, skipping product lookup");
            observability::update_circuit_breaker_state(true);
            observability::record_lookup_metrics(LookupError::Unavailable.kind(), Duration::ZERO);
            return Err(LookupError::Unavailable);
        }

        let start = Instant::now();
        let result = self
            .request_product(barcode)
            .instrument(observability::lookup_span(barcode))
            .await;
        let duration = start.elapsed();

        match &result {
            Ok(Some(product)) => {
                self.circuit_breaker.record_success();
                self.cache.insert(barcode, product.clone());
                observability::record_lookup_metrics("found", duration);
            }
            Ok(None) => {
                self.circuit_breaker.record_success();
                observability::record_lookup_metrics("not_found", duration);
            }
            Err(e) => {
                // A body we cannot parse still means the service answered
                if matches!(e, LookupError::Decode(_)) {
                    self.circuit_breaker.record_success();
                } else {
                    self.circuit_breaker.record_failure();
                }
                error_logging::log_lookup_error(e, barcode, Some(&self.base_url), Some(duration));
                observability::record_lookup_metrics(e.kind(), duration);
            }
        }
        observability::update_circuit_breaker_state(self.circuit_breaker.is_open());

        result
    }
}
