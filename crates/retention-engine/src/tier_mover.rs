//! Daily tier-move job: warm → cold. Same aggregate-then-write shape as
//! the hourly downsampler, just over the previous full day and
//! re-aggregating the warm tier's already-hourly values.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use telemetry_domain::{RetentionTier, WriteBatch};

use crate::downsample::aggregate_points_for_window;
use crate::store::StoreClient;

pub async fn run(store: &StoreClient, tier: &RetentionTier, now: DateTime<Utc>) -> anyhow::Result<()> {
    let window_end = now
        .with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let window_start = window_end - ChronoDuration::days(1);

    let points = aggregate_points_for_window(store, tier, window_start, window_end).await?;
    if points.is_empty() {
        return Ok(());
    }

    let batch = WriteBatch::new(points, Utc::now());
    store.write_batch(&batch).await?;
    Ok(())
}
