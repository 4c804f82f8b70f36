//! # Observability Configuration
//!
//! Environment-specific settings for logging, tracing and metrics.

use std::env;

use crate::errors::{AppError, AppResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// OTLP endpoint for trace export
    pub otlp_endpoint: Option<String>,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Explicit log format; chosen from the environment when `None`
    pub log_format: Option<LogFormat>,
    /// Whether to enable trace sampling
    pub enable_trace_sampling: bool,
    /// Trace sampling ratio (0.0-1.0)
    pub trace_sampling_ratio: f64,
    /// Whether to serve Prometheus metrics
    pub enable_metrics_export: bool,
    /// Additional tags attached to traces
    pub tags: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            log_format: None,
            enable_trace_sampling: false,
            trace_sampling_ratio: 1.0,
            enable_metrics_export: true,
            tags: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            otlp_endpoint: env::var("OTLP_ENDPOINT")
                .ok()
                .filter(|endpoint| !endpoint.trim().is_empty()),
            log_level: env::var("OBSERVABILITY_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: env::var("LOG_FORMAT").ok().and_then(|v| parse_log_format(&v)),
            enable_trace_sampling: env_parse("ENABLE_TRACE_SAMPLING", defaults.enable_trace_sampling),
            trace_sampling_ratio: env_parse("TRACE_SAMPLING_RATIO", defaults.trace_sampling_ratio),
            enable_metrics_export: env_parse("ENABLE_METRICS_EXPORT", defaults.enable_metrics_export),
            tags: env::var("OBSERVABILITY_TAGS")
                .map(|tags| parse_tags(&tags))
                .unwrap_or_default(),
        };
        config.add_default_tags();
        config
    }

    fn add_default_tags(&mut self) {
        let defaults = [
            ("environment", self.environment.clone()),
            ("service", "is-it-safe-bot".to_string()),
            ("version", env!("CARGO_PKG_VERSION").to_string()),
        ];
        for (key, value) in defaults {
            if !self.tags.iter().any(|(existing, _)| existing == key) {
                self.tags.push((key.to_string(), value));
            }
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Effective log format: explicit setting, else pretty in development
    pub fn effective_log_format(&self) -> LogFormat {
        match self.log_format {
            Some(format) => format,
            None if self.is_development() => LogFormat::Pretty,
            None => LogFormat::Json,
        }
    }

    /// Sampling ratio applied to exported traces
    pub fn sampling_ratio(&self) -> f64 {
        if self.enable_trace_sampling {
            self.trace_sampling_ratio
        } else {
            1.0
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if let Some(endpoint) = &self.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(AppError::Config(format!(
                    "Invalid OTLP endpoint format: {}",
                    endpoint
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.trace_sampling_ratio) {
            return Err(AppError::Config(format!(
                "Invalid trace sampling ratio: {}",
                self.trace_sampling_ratio
            )));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.trim().to_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "text" => Some(LogFormat::Pretty),
        _ => None,
    }
}

/// Parse `key1=value1,key2=value2`, skipping pairs without a key
fn parse_tags(tags_str: &str) -> Vec<(String, String)> {
    tags_str
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Environment-specific configuration presets
pub mod presets {
    use super::{LogFormat, ObservabilityConfig};

    pub fn development() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            log_format: Some(LogFormat::Pretty),
            ..Default::default()
        }
    }

    pub fn production() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "production".to_string(),
            enable_trace_sampling: true,
            trace_sampling_ratio: 0.1,
            log_level: "info".to_string(),
            log_format: Some(LogFormat::Json),
            ..Default::default()
        }
    }
}
