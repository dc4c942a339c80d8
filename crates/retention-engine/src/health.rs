//! `GET /health` reporting per-job status, same JSON health shape the
//! other services use.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::scheduler::JobRegistry;

#[derive(Clone)]
pub struct HealthState {
    pub jobs: JobRegistry,
}

pub async fn health_check(State(state): State<HealthState>) -> Json<Value> {
    let jobs: Value = state
        .jobs
        .iter()
        .map(|entry| {
            let status = entry.value().clone();
            (
                entry.key().to_string(),
                json!({
                    "last_run_at": status.last_run_at,
                    "last_success": status.last_success,
                    "consecutive_failures": status.consecutive_failures,
                }),
            )
        })
        .collect::<serde_json::Map<String, Value>>()
        .into();

    let degraded = state
        .jobs
        .iter()
        .any(|entry| entry.value().consecutive_failures >= 5);

    Json(json!({
        "status": if degraded { "degraded" } else { "healthy" },
        "service": "retention-engine",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
        "checks": { "jobs": jobs },
    }))
}
