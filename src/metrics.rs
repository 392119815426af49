//! Prometheus metrics for the search gateway
//!
//! Every metric is labelled by configuration name so the two ranking
//! configurations can be compared side by side.
//!
//! ```no_run
//! use search_ab_gateway::metrics::SEARCH_REQUESTS_TOTAL;
//!
//! SEARCH_REQUESTS_TOTAL.with_label_values(&["v2", "ok"]).inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "search_ab";

lazy_static! {
    /// Registry exported by `/metrics`
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Searches dispatched, by outcome (`ok` or an error kind)
    ///
    /// Labels: config, outcome
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_requests_total", "Total number of search requests")
            .namespace(NAMESPACE),
        &["config", "outcome"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Engine round-trip time for searches
    ///
    /// Labels: config
    pub static ref SEARCH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("search_duration_seconds", "Search engine round-trip in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["config"]
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    /// Rewrite rules that fired
    ///
    /// Labels: config, rule
    pub static ref QUERY_REWRITES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("query_rewrites_total", "Total number of query rewrites applied")
            .namespace(NAMESPACE),
        &["config", "rule"]
    ).expect("Failed to create QUERY_REWRITES_TOTAL metric");

    /// Settings pushes to the engine
    ///
    /// Labels: config, outcome
    pub static ref CONFIGURATION_APPLIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("configuration_applies_total", "Total number of configuration applies")
            .namespace(NAMESPACE),
        &["config", "outcome"]
    ).expect("Failed to create CONFIGURATION_APPLIES_TOTAL metric");
}

/// Register all metrics with [`PROMETHEUS_REGISTRY`]
///
/// Safe to call more than once; already-registered metrics are skipped.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SEARCH_REQUESTS_TOTAL.clone()),
        Box::new(SEARCH_DURATION_SECONDS.clone()),
        Box::new(QUERY_REWRITES_TOTAL.clone()),
        Box::new(CONFIGURATION_APPLIES_TOTAL.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Prometheus text exposition of [`PROMETHEUS_REGISTRY`]
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
