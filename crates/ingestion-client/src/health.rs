//! `GET /health` surface for the ingestion client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use telemetry_config::IngestionConfig;
use tokio::sync::broadcast;

use crate::client::SharedHealth;
use crate::dispatch::DispatchQueue;

#[derive(Clone)]
pub struct HealthState {
    pub health: Arc<SharedHealth>,
    pub queue: Arc<DispatchQueue>,
    pub dispatch_failed_events: Arc<AtomicU64>,
    pub event_silence_threshold: std::time::Duration,
}

pub async fn serve(
    config: Arc<IngestionConfig>,
    health: Arc<SharedHealth>,
    queue: Arc<DispatchQueue>,
    dispatch_failed_events: Arc<AtomicU64>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let state = HealthState {
        health,
        queue,
        dispatch_failed_events,
        event_silence_threshold: config.event_silence_threshold,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.health_port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind ingestion health listener");
            return;
        }
    };

    tracing::info!(%addr, "ingestion client health endpoint listening");

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            if let Err(err) = result {
                tracing::error!(error = %err, "health server exited with error");
            }
        }
        _ = shutdown_rx.recv() => {
            tracing::info!("ingestion health server shutting down");
        }
    }
}

async fn health_check(State(state): State<HealthState>) -> Json<Value> {
    let connected = state.health.is_connected();
    let silence = state.health.silence_duration();
    let unhealthy_silence = connected && silence >= state.event_silence_threshold;

    let status = if unhealthy_silence { "unhealthy" } else { "healthy" };

    Json(json!({
        "status": status,
        "service": "ingestion-client",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "checks": {
            "connected": connected,
            "active_endpoint": if state.health.is_active_primary() { "primary" } else { "fallback" },
            "silence_seconds": silence.as_secs(),
            "queue_depth": state.queue.len().await,
            "dropped_events": state.queue.dropped_events.load(Ordering::Relaxed),
            "dispatch_failed_events": state.dispatch_failed_events.load(Ordering::Relaxed),
        }
    }))
}

async fn metrics_handler() -> String {
    crate::metrics::render()
}
