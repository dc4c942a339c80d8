//! 15-minute analytics job: samples per-bucket cardinality and storage
//! growth and writes the sample into a small metrics measurement, so
//! operators can watch retention-tier growth without a separate
//! monitoring stack.

use chrono::Utc;
use telemetry_domain::{TimeSeriesPoint, WriteBatch};

use crate::flux::parse_aggregate_rows;
use crate::store::StoreClient;

const SAMPLED_MEASUREMENTS: &[&str] = &[
    "home_assistant_events",
    "home_assistant_events_hourly",
    "home_assistant_events_daily",
];

pub async fn run(store: &StoreClient) -> anyhow::Result<()> {
    let mut points = Vec::new();

    for measurement in SAMPLED_MEASUREMENTS {
        let flux = format!(
            "from(bucket: \"telemetry\") |> range(start: -1h) |> filter(fn: (r) => r._measurement == \"{measurement}\") |> group(columns: [\"entity_id\"]) |> count()"
        );
        let csv = store.query_flux(&flux).await?;
        let rows = parse_aggregate_rows(&csv);

        let cardinality = rows
            .iter()
            .map(|row| row.entity_id.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len();
        let row_count: f64 = rows.iter().map(|row| row.value).sum();

        points.push(
            TimeSeriesPoint::new("retention_analytics", Utc::now())
                .field("measurement", *measurement)
                .field("cardinality", cardinality as f64)
                .field("row_count", row_count),
        );
    }

    if points.is_empty() {
        return Ok(());
    }

    let batch = WriteBatch::new(points, Utc::now());
    store
        .write_batch(&batch)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))
}
