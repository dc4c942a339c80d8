//! `POST /events` intake wiring validate → normalize → enrich → shape and
//! handing the shaped point to the batch writer's channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use telemetry_domain::TimeSeriesPoint;
use tokio::sync::{broadcast, mpsc};

use crate::enrich::ProviderClient;
use crate::{enrich, normalize, shape, validate};

#[derive(Clone)]
pub struct AppState {
    pub points_tx: mpsc::Sender<TimeSeriesPoint>,
    pub intake_capacity: usize,
    pub providers: Vec<Arc<dyn ProviderClient>>,
    pub correlation_header_name: String,
    pub validation_errors: Arc<AtomicU64>,
    pub events_accepted: Arc<AtomicU64>,
    pub events_saturated: Arc<AtomicU64>,
}

/// An intake queue is "saturated" once fewer than 10% of its slots remain.
fn is_saturated(sender: &mpsc::Sender<TimeSeriesPoint>, capacity: usize) -> bool {
    let remaining = sender.capacity();
    (remaining as f64) <= (capacity as f64) * 0.1
}

async fn ingest_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if is_saturated(&state.points_tx, state.intake_capacity) {
        state.events_saturated.fetch_add(1, Ordering::Relaxed);
        crate::metrics::EVENTS_SATURATED.inc();
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "queue_saturated" })),
        );
    }

    let raw = match validate::validate(&body) {
        Ok(raw) => raw,
        Err(err) => {
            state.validation_errors.fetch_add(1, Ordering::Relaxed);
            crate::metrics::EVENTS_REJECTED
                .with_label_values(&[err.code()])
                .inc();
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": err.code() })));
        }
    };

    let correlation_id = headers
        .get(&state.correlation_header_name)
        .and_then(|value| value.to_str().ok());

    let normalized = normalize::normalize(raw, correlation_id);
    let enriched = enrich::enrich(normalized, &state.providers);
    let point = shape::shape(&enriched);

    match state.points_tx.try_send(point) {
        Ok(()) => {
            state.events_accepted.fetch_add(1, Ordering::Relaxed);
            crate::metrics::EVENTS_ACCEPTED.inc();
            (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
        }
        Err(_) => {
            state.events_saturated.fetch_add(1, Ordering::Relaxed);
            crate::metrics::EVENTS_SATURATED.inc();
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "queue_saturated" })),
            )
        }
    }
}

async fn metrics_handler() -> String {
    crate::metrics::render()
}

pub async fn serve(
    bind_addr: String,
    state: AppState,
    health_state: crate::health::HealthState,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let intake_routes = Router::new()
        .route("/events", post(ingest_event))
        .with_state(state);

    let observability_routes = Router::new()
        .route("/health", get(crate::health::health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(health_state);

    let app = intake_routes.merge(observability_routes);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%bind_addr, error = %err, "failed to bind enrichment server listener");
            return;
        }
    };

    tracing::info!(%bind_addr, "enrichment service listening");

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            if let Err(err) = result {
                tracing::error!(error = %err, "enrichment server exited with error");
            }
        }
        _ = shutdown_rx.recv() => {
            tracing::info!("enrichment server shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saturation_check_trips_past_ninety_percent() {
        let (tx, _rx) = mpsc::channel::<TimeSeriesPoint>(10);
        for _ in 0..9 {
            tx.send(TimeSeriesPoint::new("m", chrono::Utc::now()))
                .await
                .unwrap();
        }
        assert!(is_saturated(&tx, 10));
    }

    #[tokio::test]
    async fn saturation_check_clear_below_threshold() {
        let (tx, _rx) = mpsc::channel::<TimeSeriesPoint>(10);
        tx.send(TimeSeriesPoint::new("m", chrono::Utc::now()))
            .await
            .unwrap();
        assert!(!is_saturated(&tx, 10));
    }
}
