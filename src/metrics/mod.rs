/// Prometheus metrics for the projection and dual-write paths.
///
/// Every metric lives in the `playbook` namespace and is registered once in
/// [`PROMETHEUS_REGISTRY`] by [`init_metrics`]. `GET /metrics` renders it with
/// [`gather_metrics`].
///
/// # Example
/// ```no_run
/// use playbook::metrics::SEARCH_REQUESTS_TOTAL;
///
/// SEARCH_REQUESTS_TOTAL
///     .with_label_values(&["pickup_lines", "search", "success"])
///     .inc();
/// ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::time::Duration;

const NAMESPACE: &str = "playbook";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Total number of search engine operations
    ///
    /// Labels: index, operation, status
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_requests_total", "Total number of search engine operations")
            .namespace(NAMESPACE),
        &["index", "operation", "status"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Search engine operation duration in seconds
    ///
    /// Labels: operation
    pub static ref SEARCH_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "search_request_duration_seconds",
            "Search engine operation duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"]
    ).expect("Failed to create SEARCH_REQUEST_DURATION_SECONDS metric");

    /// Writes spanning the relational store and the search projection
    ///
    /// Labels: operation, status
    pub static ref DUAL_WRITE_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("dual_write_operations_total", "Total number of dual-store write operations")
            .namespace(NAMESPACE),
        &["operation", "status"]
    ).expect("Failed to create DUAL_WRITE_OPERATIONS_TOTAL metric");

    /// Compensating actions run after a failed dual write
    ///
    /// Labels: saga, step, outcome
    pub static ref SAGA_COMPENSATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("saga_compensations_total", "Total number of saga compensation attempts")
            .namespace(NAMESPACE),
        &["saga", "step", "outcome"]
    ).expect("Failed to create SAGA_COMPENSATIONS_TOTAL metric");

    /// Scripted reaction counter updates
    ///
    /// Labels: status
    pub static ref REACTION_SCRIPT_UPDATES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("reaction_script_updates_total", "Total number of scripted reaction updates")
            .namespace(NAMESPACE),
        &["status"]
    ).expect("Failed to create REACTION_SCRIPT_UPDATES_TOTAL metric");
}

/// Label value for an operation outcome
pub fn status_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

/// Record one search engine call
pub fn record_search_request(index: &str, operation: &str, status: &str, elapsed: Duration) {
    SEARCH_REQUESTS_TOTAL
        .with_label_values(&[index, operation, status])
        .inc();
    SEARCH_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}

/// Initialize the Prometheus metrics registry
///
/// # Errors
/// Returns an error if any metric fails to register, typically because
/// it was already registered.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUEST_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(DUAL_WRITE_OPERATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SAGA_COMPENSATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(REACTION_SCRIPT_UPDATES_TOTAL.clone()))?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
