//! Prometheus counters for the enrichment service.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, CounterVec, Gauge};

lazy_static! {
    pub static ref EVENTS_ACCEPTED: Gauge = register_gauge!(
        "enrichment_events_accepted_total",
        "Events accepted onto the intake queue"
    )
    .expect("failed to register EVENTS_ACCEPTED metric");

    pub static ref EVENTS_REJECTED: CounterVec = register_counter_vec!(
        "enrichment_events_rejected_total",
        "Events rejected at intake, labeled by validation error code",
        &["code"]
    )
    .expect("failed to register EVENTS_REJECTED metric");

    pub static ref EVENTS_SATURATED: Gauge = register_gauge!(
        "enrichment_events_saturated_total",
        "Events rejected with 503 because the intake queue was over its high-water mark"
    )
    .expect("failed to register EVENTS_SATURATED metric");

    pub static ref BATCHES_FLUSHED: Gauge = register_gauge!(
        "enrichment_batches_flushed_total",
        "Batches successfully written to the TimeSeriesStore"
    )
    .expect("failed to register BATCHES_FLUSHED metric");

    pub static ref BATCHES_DEAD_LETTERED: Gauge = register_gauge!(
        "enrichment_batches_dead_lettered_total",
        "Batches that exhausted flush retries and were dead-lettered"
    )
    .expect("failed to register BATCHES_DEAD_LETTERED metric");
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
