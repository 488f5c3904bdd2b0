use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry_prometheus::PrometheusExporter;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing_subscriber::{EnvFilter, fmt};

static LOGGING: OnceLock<()> = OnceLock::new();
static TELEMETRY: OnceCell<TelemetryState> = OnceCell::new();
static METRICS: OnceCell<MetricsHandles> = OnceCell::new();

struct TelemetryState {
    _provider: SdkMeterProvider,
    registry: Registry,
}

struct MetricsHandles {
    events: Counter<u64>,
    stream_connects: Counter<u64>,
    stream_failures: Counter<u64>,
    lookups: Counter<u64>,
    lookup_latency_histogram: Histogram<f64>,
}

/// Initialize tracing and metrics exporters. Safe to call multiple times.
pub fn init() -> Result<()> {
    configure_logging();
    configure_metrics()?;
    Ok(())
}

/// Install only the log subscriber; used by the one-shot lookup commands.
pub fn init_logging() {
    configure_logging();
}

fn configure_logging() {
    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn configure_metrics() -> Result<&'static TelemetryState> {
    TELEMETRY.get_or_try_init(|| {
        let registry = Registry::new();
        let exporter = build_exporter(&registry)?;

        let provider = SdkMeterProvider::builder()
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                "modrelay",
            )]))
            .with_reader(exporter)
            .build();

        global::set_meter_provider(provider.clone());

        let meter = global::meter("modrelay");
        let events = meter
            .u64_counter("modrelay_events_total")
            .with_description("Events decoded from the module event feed")
            .init();
        let stream_connects = meter
            .u64_counter("modrelay_stream_connects_total")
            .with_description("Successful event stream subscriptions")
            .init();
        let stream_failures = meter
            .u64_counter("modrelay_stream_failures_total")
            .with_description("Event stream subscriptions that ended in failure")
            .init();
        let lookups = meter
            .u64_counter("modrelay_lookups_total")
            .with_description("Reference index lookups served")
            .init();
        let lookup_latency_histogram = meter
            .f64_histogram("modrelay_lookup_latency_ms")
            .with_description("Latency of reference index lookups in milliseconds")
            .init();

        METRICS
            .set(MetricsHandles {
                events,
                stream_connects,
                stream_failures,
                lookups,
                lookup_latency_histogram,
            })
            .map_err(|_| anyhow!("metrics handles already initialized"))?;

        Ok(TelemetryState {
            _provider: provider,
            registry,
        })
    })
}

fn build_exporter(registry: &Registry) -> Result<PrometheusExporter> {
    opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .context("failed to build Prometheus exporter")
}

fn metrics() -> Option<&'static MetricsHandles> {
    METRICS.get()
}

fn state() -> Option<&'static TelemetryState> {
    TELEMETRY.get()
}

pub fn record_event(kind: &'static str) {
    if let Some(metrics) = metrics() {
        metrics.events.add(1, &[KeyValue::new("kind", kind)]);
    }
}

pub fn record_stream_connect() {
    if let Some(metrics) = metrics() {
        metrics.stream_connects.add(1, &[]);
    }
}

pub fn record_stream_failure(reason: &'static str) {
    if let Some(metrics) = metrics() {
        metrics
            .stream_failures
            .add(1, &[KeyValue::new("reason", reason)]);
    }
}

/// Record a served lookup and its latency in milliseconds.
pub fn record_lookup(kind: &'static str, latency_ms: f64) {
    if let Some(metrics) = metrics() {
        let attrs = [KeyValue::new("kind", kind)];
        metrics.lookups.add(1, &attrs);
        metrics.lookup_latency_histogram.record(latency_ms, &attrs);
    }
}

/// Render all currently collected metrics in Prometheus text format.
pub fn export_prometheus() -> Result<String> {
    let state = state().ok_or_else(|| anyhow!("telemetry not initialized"))?;
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("failed to encode metrics")?;
    String::from_utf8(buffer).context("metrics buffer is not valid UTF-8")
}
