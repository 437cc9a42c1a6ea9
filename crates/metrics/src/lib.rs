//! Prometheus registration: the engine facade's two headline gauges, the
//! process's own resource usage, and the HTTP front-end's request
//! counter/histogram, all served at `/metrics` by the HTTP front-end.

use std::sync::LazyLock;

use prometheus::{
    process_collector::ProcessCollector, CounterVec, Encoder, Gauge, HistogramVec, Opts, Registry, TextEncoder,
};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static NUM_INITIATES: LazyLock<Gauge> = LazyLock::new(|| {
    Gauge::new("num_initiates", "Number of initiate requests sent").unwrap()
});

pub static NUM_ABORTS: LazyLock<Gauge> = LazyLock::new(|| {
    Gauge::new("num_aborts", "Number of changes aborted").unwrap()
});

/// Count of HTTP requests served, by method and response status. Deliberately
/// excludes the request path: the front-end's catch-all hands every plan's
/// arbitrary `url` to a handler, so the path itself is unbounded cardinality.
pub static HTTP_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    CounterVec::new(Opts::new("http_requests_total", "Number of HTTP requests served"), &["method", "status"]).unwrap()
});

pub static HTTP_REQUEST_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(prometheus::HistogramOpts::new("http_request_duration_seconds", "HTTP request latency in seconds"), &["method", "status"]).unwrap()
});

/// Registers every metric into the shared registry, including the
/// process-wide collector (open fds, RSS, CPU time - read from `/proc` on
/// Linux). Idempotent; call once at startup before serving `/metrics`.
pub fn register() -> anyhow::Result<()> {
    REGISTRY.register(Box::new(NUM_INITIATES.clone()))?;
    REGISTRY.register(Box::new(NUM_ABORTS.clone()))?;
    REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(ProcessCollector::for_self()))?;
    Ok(())
}

/// Records one served request's outcome.
pub fn observe_request(method: &str, status: u16, duration_secs: f64) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL.with_label_values(&[method, &status]).inc();
    HTTP_REQUEST_DURATION_SECONDS.with_label_values(&[method, &status]).observe(duration_secs);
}

/// Renders the registry in Prometheus text exposition format.
pub fn render() -> anyhow::Result<String> {
    let metric_families = REGISTRY.gather();
    let mut buf = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
