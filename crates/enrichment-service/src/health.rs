//! `GET /health` surface for the enrichment service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use telemetry_domain::TimeSeriesPoint;
use tokio::sync::mpsc;

use crate::batch::BatchWriter;

#[derive(Clone)]
pub struct HealthState {
    pub points_tx: mpsc::Sender<TimeSeriesPoint>,
    pub intake_capacity: usize,
    pub batch_writer: Arc<BatchWriter>,
    pub validation_errors: Arc<AtomicU64>,
    pub events_accepted: Arc<AtomicU64>,
    pub events_saturated: Arc<AtomicU64>,
}

pub async fn health_check(State(state): State<HealthState>) -> Json<Value> {
    let queue_depth = state.intake_capacity - state.points_tx.capacity();
    let queue_fraction = queue_depth as f64 / state.intake_capacity.max(1) as f64;

    let status = if queue_fraction >= 0.9 { "degraded" } else { "healthy" };

    Json(json!({
        "status": status,
        "service": "enrichment-service",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "checks": {
            "queue_depth": queue_depth,
            "queue_capacity": state.intake_capacity,
            "validation_errors": state.validation_errors.load(Ordering::Relaxed),
            "events_accepted": state.events_accepted.load(Ordering::Relaxed),
            "events_saturated": state.events_saturated.load(Ordering::Relaxed),
            "batches_flushed": state.batch_writer.batches_flushed.load(Ordering::Relaxed),
            "batches_dead_lettered": state.batch_writer.batches_dead_lettered.load(Ordering::Relaxed),
        }
    }))
}
