//! # Application Error Types
//!
//! This module defines common error types used throughout the Is It Safe bot.
//! It provides structured error handling for configuration, storage and
//! product lookup components.

use std::fmt;

use crate::blacklist::BlacklistError;
use crate::lookup::LookupError;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (barcodes, blacklist terms, etc.)
    Validation(String),
    /// Blacklist storage errors
    Storage(String),
    /// Product lookup errors
    Lookup(String),
    /// Network/communication errors
    Network(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Storage(msg) => write!(f, "[STORAGE] {}", msg),
            AppError::Lookup(msg) => write!(f, "[LOOKUP] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<BlacklistError> for AppError {
    fn from(err: BlacklistError) -> Self {
        match err {
            BlacklistError::Storage(msg) => AppError::Storage(msg),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        AppError::Lookup(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log blacklist storage errors with contextual information
    pub fn log_storage_error(
        error: &impl std::fmt::Display,
        operation: &str,
        owner_id: Option<i64>,
        backend: &str,
    ) {
        error!(
            error = %error,
            operation = %operation,
            owner_id = ?owner_id,
            backend = %backend,
            "Blacklist storage operation failed"
        );
    }

    /// Log product lookup errors with barcode and endpoint context
    pub fn log_lookup_error(
        error: &impl std::fmt::Display,
        barcode: &str,
        endpoint: Option<&str>,
        duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            barcode = %barcode,
            endpoint = ?endpoint,
            duration_ms = ?duration.map(|d| d.as_millis()),
            "Product lookup failed"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: Option<i64>,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = ?user_id,
            input_type = %input_type,
            input_value = ?input_value.map(|v| if v.chars().count() > 100 {
                format!("{}...", v.chars().take(100).collect::<String>())
            } else {
                v.to_string()
            }),
            "Validation failed"
        );
    }

    /// Log internal application errors with component context
    pub fn log_internal_error(
        error: &impl std::fmt::Display,
        component: &str,
        operation: &str,
        user_id: Option<i64>,
    ) {
        error!(
            error = %error,
            component = %component,
            operation = %operation,
            user_id = ?user_id,
            "Internal application error"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            AppError::Config("bad port".to_string()).to_string(),
            "[CONFIG] bad port"
        );
        assert_eq!(
            AppError::Lookup("timed out".to_string()).to_string(),
            "[LOOKUP] timed out"
        );
    }

    #[test]
    fn test_blacklist_error_conversion() {
        let err: AppError = BlacklistError::Duplicate("Milk".to_string()).into();
        assert!(matches!(err, AppError::Validation(_)));

        let err: AppError = BlacklistError::Storage("disk full".to_string()).into();
        assert_eq!(err, AppError::Storage("disk full".to_string()));
    }

    #[test]
    fn test_lookup_error_conversion() {
        let err: AppError = LookupError::Timeout.into();
        assert!(matches!(err, AppError::Lookup(_)));
    }
}
