//! `GET /health` / `GET /latest` surface shared by all six provider
//! binaries.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use telemetry_domain::ProviderFields;
use tokio::sync::broadcast;

use crate::framework::PollingProvider;

#[derive(Clone)]
struct ProviderState<T: Clone + Send + Sync + 'static> {
    provider: Arc<PollingProvider<T>>,
    key: &'static str,
}

pub async fn serve<T>(
    bind_addr: String,
    provider: Arc<PollingProvider<T>>,
    key: &'static str,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    T: Clone + Send + Sync + 'static + Into<ProviderFields>,
{
    let state = ProviderState { provider, key };

    let app = Router::new()
        .route("/health", get(health_check::<T>))
        .route("/latest", get(latest::<T>))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%bind_addr, error = %err, "failed to bind provider health listener");
            return;
        }
    };

    tracing::info!(%bind_addr, "provider health endpoint listening");

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            if let Err(err) = result {
                tracing::error!(error = %err, "provider health server exited with error");
            }
        }
        _ = shutdown_rx.recv() => {
            tracing::info!("provider health server shutting down");
        }
    }
}

async fn health_check<T>(State(state): State<ProviderState<T>>) -> Json<Value>
where
    T: Clone + Send + Sync + 'static + Into<ProviderFields>,
{
    let health = state.provider.health(state.key);
    Json(json!({
        "last_success_at": health.last_success_at,
        "last_error": health.last_error,
        "poll_count": health.poll_count,
        "failure_count": health.failure_count,
        "cache_hit_rate": health.cache_hit_rate,
        "ttl_seconds": health.ttl_seconds,
        "stale": health.stale,
    }))
}

async fn latest<T>(State(state): State<ProviderState<T>>) -> Json<Value>
where
    T: Clone + Send + Sync + 'static + Into<ProviderFields>,
{
    match state.provider.latest(state.key) {
        Some(reading) => Json(json!(reading)),
        None => Json(json!({ "error": "no_reading_yet" })),
    }
}
