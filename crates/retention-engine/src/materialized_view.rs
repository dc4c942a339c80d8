//! Materialized views: a small set of named pre-aggregates computed from
//! hot+warm data, e.g. "daily energy by device" and "hourly room
//! activity". Each view is independent — one view's query
//! or write failure must not block the others, so `refresh_all` collects
//! per-view results rather than short-circuiting on the first error.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use telemetry_domain::{AggregationFn, RetentionTier, TimeSeriesPoint, WriteBatch};
use tracing::warn;

use crate::downsample::aggregate_points_for_window;
use crate::store::StoreClient;

pub struct ViewDefinition {
    pub name: &'static str,
    pub source_measurement: &'static str,
    pub destination_measurement: &'static str,
    pub aggregation_functions: &'static [AggregationFn],
}

pub fn views() -> Vec<ViewDefinition> {
    vec![
        ViewDefinition {
            name: "daily_energy_by_device",
            source_measurement: "home_assistant_events_hourly",
            destination_measurement: "mv_daily_energy_by_device",
            aggregation_functions: &[AggregationFn::Mean, AggregationFn::Max],
        },
        ViewDefinition {
            name: "hourly_room_activity",
            source_measurement: "home_assistant_events",
            destination_measurement: "mv_hourly_room_activity",
            aggregation_functions: &[AggregationFn::Count],
        },
    ]
}

/// Refresh every registered view over the hour immediately preceding `now`,
/// logging and continuing past any single view's failure.
pub async fn run(store: &StoreClient, now: DateTime<Utc>) -> anyhow::Result<()> {
    let window_end = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let window_start = window_end - ChronoDuration::hours(1);

    for view in views() {
        if let Err(err) = refresh_view(store, &view, window_start, window_end).await {
            warn!(view = view.name, error = %err, "materialized view refresh failed, continuing with remaining views");
        }
    }

    Ok(())
}

async fn refresh_view(
    store: &StoreClient,
    view: &ViewDefinition,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> anyhow::Result<()> {
    let tier = RetentionTier {
        tier: telemetry_domain::Tier::Warm,
        source_measurement: view.source_measurement.to_string(),
        destination_measurement: view.destination_measurement.to_string(),
        downsample_window: std::time::Duration::from_secs(3600),
        retention_horizon: std::time::Duration::from_secs(90 * 24 * 3600),
        aggregation_functions: view.aggregation_functions.to_vec(),
    };

    let points: Vec<TimeSeriesPoint> = aggregate_points_for_window(store, &tier, window_start, window_end).await?;
    if points.is_empty() {
        return Ok(());
    }

    let batch = WriteBatch::new(points, Utc::now());
    store.write_batch(&batch).await
        .map_err(|err| anyhow::anyhow!("{err}"))
}
