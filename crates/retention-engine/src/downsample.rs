//! Hourly downsample job: hot → warm. For the previous full hour window,
//! aggregates the hot measurement's points per `(entity_id, domain)` and
//! writes one row per aggregation function into the warm measurement,
//! keyed on the window start so re-running the same window is idempotent.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use telemetry_domain::{AggregationFn, RetentionTier, TagKey, TimeSeriesPoint, WriteBatch};

use crate::flux::{parse_aggregate_rows, AggregateRow};
use crate::store::StoreClient;

/// Run one downsample pass for the hour immediately preceding `now`.
pub async fn run(store: &StoreClient, tier: &RetentionTier, now: DateTime<Utc>) -> anyhow::Result<()> {
    let window_end = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let window_start = window_end - ChronoDuration::hours(1);

    let points = aggregate_points_for_window(store, tier, window_start, window_end).await?;
    if points.is_empty() {
        return Ok(());
    }

    let batch = WriteBatch::new(points, Utc::now());
    store.write_batch(&batch).await?;
    Ok(())
}

/// Query `tier.source_measurement` over `[window_start, window_end)` and
/// aggregate into `tier.destination_measurement` points keyed on
/// `window_start`. Shared by the hourly downsampler and the daily
/// tier-mover, which differ only in window size and source/destination tier.
pub async fn aggregate_points_for_window(
    store: &StoreClient,
    tier: &RetentionTier,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> anyhow::Result<Vec<TimeSeriesPoint>> {
    let flux = build_flux_query(&tier.source_measurement, window_start, window_end);
    let csv = store.query_flux(&flux).await?;
    let rows = parse_aggregate_rows(&csv);

    Ok(aggregate_into_points(
        &rows,
        &tier.destination_measurement,
        &tier.aggregation_functions,
        window_start,
    ))
}

fn build_flux_query(measurement: &str, start: DateTime<Utc>, stop: DateTime<Utc>) -> String {
    format!(
        "from(bucket: \"telemetry\") |> range(start: {}, stop: {}) |> filter(fn: (r) => r._measurement == \"{measurement}\")",
        start.to_rfc3339(),
        stop.to_rfc3339(),
    )
}

/// Group raw per-point rows by `(entity_id, domain)` and emit one
/// `TimeSeriesPoint` per group, with one field per requested aggregation
/// function. The point's timestamp is always `window_start`, so re-running
/// the job for the same window overwrites the same series (last write
/// wins) rather than duplicating rows.
fn aggregate_into_points(
    rows: &[AggregateRow],
    destination_measurement: &str,
    functions: &[AggregationFn],
    window_start: DateTime<Utc>,
) -> Vec<TimeSeriesPoint> {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.entity_id.clone(), row.domain.clone()))
            .or_default()
            .push(row.value);
    }

    groups
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|((entity_id, domain), values)| {
            let mut point = TimeSeriesPoint::new(destination_measurement, window_start)
                .tag(TagKey::EntityId, entity_id)
                .tag(TagKey::Domain, domain);

            for func in functions {
                let (name, value) = apply_aggregation(*func, &values);
                point = point.field(name, value);
            }

            point
        })
        .collect()
}

fn apply_aggregation(func: AggregationFn, values: &[f64]) -> (&'static str, f64) {
    match func {
        AggregationFn::Count => ("count", values.len() as f64),
        AggregationFn::Mean => ("mean", values.iter().sum::<f64>() / values.len() as f64),
        AggregationFn::Min => ("min", values.iter().cloned().fold(f64::INFINITY, f64::min)),
        AggregationFn::Max => ("max", values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
        AggregationFn::Last => ("last", *values.last().unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entity_id: &str, domain: &str, value: f64) -> AggregateRow {
        AggregateRow {
            entity_id: entity_id.to_string(),
            domain: domain.to_string(),
            field: "state".to_string(),
            value,
        }
    }

    #[test]
    fn aggregates_per_entity_with_requested_functions() {
        let rows = vec![
            row("sensor.power", "sensor", 10.0),
            row("sensor.power", "sensor", 20.0),
            row("sensor.power", "sensor", 30.0),
        ];
        let window_start = Utc::now();
        let points = aggregate_into_points(
            &rows,
            "home_assistant_events_hourly",
            &[AggregationFn::Count, AggregationFn::Mean, AggregationFn::Min, AggregationFn::Max],
            window_start,
        );

        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.fields.get("count").unwrap(), &telemetry_domain::FieldValue::Float(3.0));
        assert_eq!(point.fields.get("mean").unwrap(), &telemetry_domain::FieldValue::Float(20.0));
        assert_eq!(point.fields.get("min").unwrap(), &telemetry_domain::FieldValue::Float(10.0));
        assert_eq!(point.fields.get("max").unwrap(), &telemetry_domain::FieldValue::Float(30.0));
    }

    #[test]
    fn repeated_runs_for_the_same_window_produce_identical_points() {
        let rows = vec![row("light.kitchen", "light", 1.0), row("light.kitchen", "light", 2.0)];
        let window_start = Utc::now();

        let first = aggregate_into_points(&rows, "dest", &[AggregationFn::Mean], window_start);
        let second = aggregate_into_points(&rows, "dest", &[AggregationFn::Mean], window_start);

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].timestamp_ns, second[0].timestamp_ns);
        assert_eq!(first[0].fields, second[0].fields);
    }

    #[test]
    fn empty_rows_yield_no_points() {
        assert!(aggregate_into_points(&[], "dest", &[AggregationFn::Count], Utc::now()).is_empty());
    }
}
