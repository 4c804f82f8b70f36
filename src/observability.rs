//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Structured logging through `tracing-subscriber`
//! - Prometheus metrics and the recording helpers used across the crate
//! - OpenTelemetry trace export when an OTLP endpoint is configured
//! - A small HTTP server exposing `/metrics`, `/health/live` and `/health/ready`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hyper::server::conn::http1;
use hyper::{Method, StatusCode};
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::global;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tokio::net::TcpListener;
use tracing_subscriber::prelude::*;

use crate::blacklist::BlacklistStore;
use crate::observability_config::{LogFormat, ObservabilityConfig};

/// Initialize logging, metrics and trace export
///
/// Returns the Prometheus handle used by the metrics server, or `None` when
/// metrics export is disabled.
pub fn init_observability(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    init_tracing(config)?;

    let metrics_handle = if config.enable_metrics_export {
        Some(init_metrics()?)
    } else {
        tracing::info!("Metrics export disabled");
        None
    };

    init_opentelemetry_tracing(config)?;

    tracing::info!(
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        metrics_enabled = %config.enable_metrics_export,
        "Observability stack initialized successfully"
    );
    Ok(metrics_handle)
}

/// Initialize structured logging
fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        .add_directive(format!("is_it_safe={}", config.log_level).parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("teloxide=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    let format = config.effective_log_format();
    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        log_format = ?format,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Install the Prometheus recorder
fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics collection initialized");
    Ok(handle)
}

/// Install an OTLP tracer provider when an endpoint is configured
fn init_opentelemetry_tracing(config: &ObservabilityConfig) -> Result<()> {
    let Some(endpoint) = &config.otlp_endpoint else {
        tracing::info!("OpenTelemetry tracing disabled (no OTLP endpoint configured)");
        return Ok(());
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;

    let resource = Resource::builder()
        .with_service_name("is-it-safe-bot")
        .with_attributes(
            config
                .tags
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone())),
        )
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::TraceIdRatioBased(config.sampling_ratio()))
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider);

    tracing::info!(
        otlp_endpoint = %endpoint,
        trace_sampling_ratio = %config.sampling_ratio(),
        "OpenTelemetry tracing initialized with OTLP export"
    );
    Ok(())
}

/// Start the metrics and health check server on `0.0.0.0:port`
pub async fn start_metrics_server(
    metrics_handle: Option<PrometheusHandle>,
    port: u16,
    store: Option<Arc<dyn BlacklistStore>>,
) -> Result<SocketAddr> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    serve_metrics(listener, metrics_handle, store)
}

/// Serve metrics and health checks on an already bound listener
pub fn serve_metrics(
    listener: TcpListener,
    metrics_handle: Option<PrometheusHandle>,
    store: Option<Arc<dyn BlacklistStore>>,
) -> Result<SocketAddr> {
    let addr = listener.local_addr()?;
    tracing::info!("Metrics server listening on {}", addr);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let metrics_handle = metrics_handle.clone();
                    let store = store.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let store = store.clone();
                                async move {
                                    let (status, body) = route_request(
                                        req.method(),
                                        req.uri().path(),
                                        metrics_handle.as_ref(),
                                        store.as_deref(),
                                    )
                                    .await;
                                    let mut response = hyper::Response::new(body);
                                    *response.status_mut() = status;
                                    if status == StatusCode::OK && req.uri().path() == "/metrics" {
                                        response.headers_mut().insert(
                                            "content-type",
                                            hyper::header::HeaderValue::from_static(
                                                "text/plain; version=0.0.4; charset=utf-8",
                                            ),
                                        );
                                    }
                                    Ok::<_, std::convert::Infallible>(response)
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            tracing::error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Error accepting connection: {}", e);
                }
            }
        }
    });

    Ok(addr)
}

/// Answer one metrics server request
pub async fn route_request(
    method: &Method,
    path: &str,
    metrics_handle: Option<&PrometheusHandle>,
    store: Option<&dyn BlacklistStore>,
) -> (StatusCode, String) {
    match (method, path) {
        (&Method::GET, "/metrics") => match metrics_handle {
            Some(handle) => (StatusCode::OK, handle.render()),
            None => (StatusCode::NOT_FOUND, "Metrics export disabled".to_string()),
        },
        (&Method::GET, "/health/live") => (StatusCode::OK, "OK".to_string()),
        (&Method::GET, "/health/ready") => match perform_readiness_checks(store).await {
            Ok(()) => (StatusCode::OK, "OK".to_string()),
            Err(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("NOT READY: {}", e),
            ),
        },
        _ => (StatusCode::NOT_FOUND, "Not Found".to_string()),
    }
}

/// Readiness: the blacklist store must answer its health check
pub async fn perform_readiness_checks(store: Option<&dyn BlacklistStore>) -> Result<()> {
    if let Some(store) = store {
        store.health_check().await.map_err(|e| {
            anyhow::anyhow!("{} storage health check failed: {}", store.backend_name(), e)
        })?;
        tracing::debug!(backend = store.backend_name(), "Storage health check passed");
    }
    Ok(())
}

/// Create a span for product lookups
pub fn lookup_span(barcode: &str) -> tracing::Span {
    tracing::info_span!("product_lookup", barcode = barcode, component = "lookup")
}

/// Create a span for blacklist storage operations
pub fn storage_span(operation: &str, backend: &str) -> tracing::Span {
    tracing::info_span!(
        "storage_operation",
        operation = operation,
        backend = backend,
        component = "storage"
    )
}

/// Create a span for Telegram bot operations
pub fn telegram_span(operation: &str, user_id: Option<i64>) -> tracing::Span {
    tracing::info_span!(
        "telegram_operation",
        operation = operation,
        user_id = user_id,
        component = "telegram"
    )
}

/// Record the outcome of a product lookup
pub fn record_lookup_metrics(result: &str, duration: Duration) {
    let result = result.to_string();
    metrics::counter!("product_lookups_total", "result" => result).increment(1);
    metrics::histogram!("product_lookup_duration_seconds").record(duration.as_secs_f64());
}

/// Record an analysis verdict and the number of matched terms
pub fn record_analysis_metrics(is_safe: bool, matched_terms: usize) {
    let verdict = if is_safe { "safe" } else { "unsafe" };
    metrics::counter!("analyses_total", "verdict" => verdict).increment(1);
    metrics::histogram!("analysis_matched_terms").record(matched_terms as f64);
}

/// Record a blacklist mutation
pub fn record_blacklist_operation(operation: &str, success: bool, duration: Duration) {
    let operation = operation.to_string();
    let result = if success { "success" } else { "failure" };
    metrics::counter!("blacklist_operations_total", "operation" => operation.clone(), "result" => result)
        .increment(1);
    record_storage_duration(&operation, duration);
}

/// Record how long a storage round trip took
pub fn record_storage_duration(operation: &str, duration: Duration) {
    let operation = operation.to_string();
    metrics::histogram!("storage_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record request metrics
pub fn record_request_metrics(method: &str, status: u16, duration: Duration) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!("requests_total", "method" => method, "status" => status).increment(1);
    metrics::histogram!("request_duration_seconds").record(duration.as_secs_f64());
}

/// Update circuit breaker state metric
pub fn update_circuit_breaker_state(is_open: bool) {
    metrics::gauge!("circuit_breaker_state").set(if is_open { 1.0 } else { 0.0 });
}

/// Record Telegram message processing metrics
pub fn record_telegram_message(message_type: &str) {
    let message_type = message_type.to_string();
    metrics::counter!("telegram_messages_total", "type" => message_type).increment(1);
}
