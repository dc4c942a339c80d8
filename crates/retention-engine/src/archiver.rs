//! Daily archive job: cold → object store. Rows older than
//! the cold tier's retention horizon are serialized to newline-delimited
//! JSON and PUT to a time-partitioned object-store key; only once that PUT
//! is confirmed does the job delete the corresponding rows from the store.
//! A failure at any step must leave source rows untouched.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use telemetry_domain::RetentionTier;

use crate::flux::parse_aggregate_rows;
use crate::store::StoreClient;

pub struct ObjectStoreClient {
    http: reqwest::Client,
    base_url: String,
    prefix: String,
    credentials: Option<String>,
}

impl ObjectStoreClient {
    pub fn new(base_url: String, prefix: String, credentials: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            prefix,
            credentials,
        }
    }

    /// PUT `body` at a `yyyy/mm/dd/{bucket}.ndjson` key, returning once
    /// the object store confirms the write with a 2xx.
    pub async fn put_partitioned(&self, partition_date: DateTime<Utc>, bucket: &str, body: String) -> anyhow::Result<()> {
        let key = format!(
            "{}/{:04}/{:02}/{:02}/{bucket}.ndjson",
            self.prefix,
            partition_date.format("%Y"),
            partition_date.format("%m"),
            partition_date.format("%d"),
        );

        let mut request = self
            .http
            .put(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
            .body(body);

        if let Some(credentials) = &self.credentials {
            request = request.header("Authorization", format!("Bearer {credentials}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| anyhow::anyhow!("object store PUT failed: {err}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("object store rejected PUT: {}", response.status()))
        }
    }
}

/// Archive the cold tier's rows older than its retention horizon into the
/// object store, then delete them from the TimeSeriesStore. The delete only
/// runs after `put_partitioned` returns `Ok`.
pub async fn run(
    store: &StoreClient,
    object_store: &ObjectStoreClient,
    tier: &RetentionTier,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let horizon = chrono::Duration::from_std(tier.retention_horizon)
        .unwrap_or_else(|_| ChronoDuration::days(365));
    let cutoff = now - horizon;

    let flux = format!(
        "from(bucket: \"telemetry\") |> range(start: 1970-01-01T00:00:00Z, stop: {}) |> filter(fn: (r) => r._measurement == \"{}\")",
        cutoff.to_rfc3339(),
        tier.source_measurement,
    );
    let csv = store.query_flux(&flux).await?;
    let rows = parse_aggregate_rows(&csv);

    if rows.is_empty() {
        return Ok(());
    }

    let ndjson = rows
        .iter()
        .map(|row| serde_json::to_string(row).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");

    object_store
        .put_partitioned(cutoff, &tier.source_measurement, ndjson)
        .await?;

    store.delete_before(&tier.source_measurement, cutoff).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitioned_key_format_is_date_sharded() {
        let date = Utc::now();
        let expected_prefix = format!(
            "my-prefix/{:04}/{:02}/{:02}",
            date.format("%Y"),
            date.format("%m"),
            date.format("%d")
        );
        let key = format!(
            "{}/{:04}/{:02}/{:02}/{}.ndjson",
            "my-prefix",
            date.format("%Y"),
            date.format("%m"),
            date.format("%d"),
            "cold_measurement"
        );
        assert!(key.starts_with(&expected_prefix));
    }
}
