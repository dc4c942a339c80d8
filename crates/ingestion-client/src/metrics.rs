//! Prometheus counters for the ingestion client.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, CounterVec, Gauge};

lazy_static! {
    pub static ref EVENTS_FORWARDED: CounterVec = register_counter_vec!(
        "ingestion_events_forwarded_total",
        "Events received from the hub and handed to the dispatch queue",
        &["endpoint"]
    )
    .expect("failed to register EVENTS_FORWARDED metric");

    pub static ref DROPPED_EVENTS: Gauge = register_gauge!(
        "ingestion_dropped_events_total",
        "Events dropped because the dispatch queue was at capacity"
    )
    .expect("failed to register DROPPED_EVENTS metric");

    pub static ref DISPATCH_FAILED_EVENTS: Gauge = register_gauge!(
        "ingestion_dispatch_failed_events_total",
        "Events that exhausted dispatch retries without success"
    )
    .expect("failed to register DISPATCH_FAILED_EVENTS metric");

    pub static ref RECONNECTS: CounterVec = register_counter_vec!(
        "ingestion_reconnects_total",
        "Hub reconnect attempts",
        &["reason"]
    )
    .expect("failed to register RECONNECTS metric");
}

pub fn render() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
