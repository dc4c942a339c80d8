//! TimeSeriesStore HTTP client, duplicated from the enrichment service's
//! `store.rs` — each service that touches the store gets its own small
//! client rather than sharing one crate across process boundaries — with
//! an added `delete_before` for the archiver's "delete
//! from store after a confirmed archive write" step.

use telemetry_common::Error;
use telemetry_config::StoreConfig;
use telemetry_domain::{FieldValue, WriteBatch};

#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    url: String,
    token: String,
    org: String,
    bucket: String,
}

impl StoreClient {
    pub fn new(config: &StoreConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.write_timeout)
            .build()
            .expect("failed to build TimeSeriesStore HTTP client");

        Self {
            http,
            url: config.url.clone(),
            token: config.token.clone(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
        }
    }

    pub async fn write_batch(&self, batch: &WriteBatch) -> Result<(), Error> {
        let body = encode_line_protocol(batch);

        let response = self
            .http
            .post(format!("{}/api/v2/write", self.url.trim_end_matches('/')))
            .query(&[("org", self.org.as_str()), ("bucket", self.bucket.as_str())])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|err| Error::Store(format!("write request failed: {err}")))?;

        if response.status().is_success() {
            Ok(())
        } else if response.status().is_server_error() || response.status().as_u16() == 429 {
            Err(Error::Transient(format!("store write returned {}", response.status())))
        } else {
            Err(Error::Store(format!("store rejected write: {}", response.status())))
        }
    }

    /// Run a Flux query against `{url}/api/v2/query`, returning the raw
    /// annotated-CSV response body.
    pub async fn query_flux(&self, flux: &str) -> Result<String, Error> {
        let response = self
            .http
            .post(format!("{}/api/v2/query", self.url.trim_end_matches('/')))
            .query(&[("org", self.org.as_str())])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(flux.to_string())
            .send()
            .await
            .map_err(|err| Error::Store(format!("query request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(Error::Store(format!("store rejected query: {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|err| Error::Store(format!("failed to read query response: {err}")))
    }

    /// Delete rows in `measurement` with a start timestamp strictly before
    /// `before`, used by the archiver only after its object-store PUT is
    /// confirmed — a failed archive step must not delete source rows.
    pub async fn delete_before(&self, measurement: &str, before: chrono::DateTime<chrono::Utc>) -> Result<(), Error> {
        let predicate = format!("_measurement=\"{measurement}\"");
        let body = serde_json::json!({
            "start": "1970-01-01T00:00:00Z",
            "stop": before.to_rfc3339(),
            "predicate": predicate,
        });

        let response = self
            .http
            .post(format!("{}/api/v2/delete", self.url.trim_end_matches('/')))
            .query(&[("org", self.org.as_str()), ("bucket", self.bucket.as_str())])
            .header("Authorization", format!("Token {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Store(format!("delete request failed: {err}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Store(format!("store rejected delete: {}", response.status())))
        }
    }
}

fn encode_line_protocol(batch: &WriteBatch) -> String {
    let mut lines = Vec::with_capacity(batch.points.len());

    for point in &batch.points {
        let mut line = escape_measurement(&point.measurement);

        for (tag, value) in &point.tags {
            line.push(',');
            line.push_str(tag.as_str());
            line.push('=');
            line.push_str(&escape_tag_value(value));
        }

        line.push(' ');
        let fields: Vec<String> = point
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape_field_key(key), encode_field_value(value)))
            .collect();
        line.push_str(&fields.join(","));

        line.push(' ');
        line.push_str(&point.timestamp_ns.to_string());

        lines.push(line);
    }

    lines.join("\n")
}

fn encode_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Int(i) => format!("{i}i"),
        FieldValue::Bool(b) => b.to_string(),
    }
}

fn escape_measurement(value: &str) -> String {
    value.replace(' ', "\\ ").replace(',', "\\,")
}

fn escape_tag_value(value: &str) -> String {
    value.replace(' ', "\\ ").replace(',', "\\,").replace('=', "\\=")
}

fn escape_field_key(value: &str) -> String {
    escape_tag_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use telemetry_domain::{TagKey, TimeSeriesPoint};

    #[test]
    fn encodes_single_point_as_line_protocol() {
        let point = TimeSeriesPoint::new("home_assistant_events_hourly", Utc::now())
            .tag(TagKey::EntityId, "sensor.power")
            .field("mean", 42.0);
        let batch = WriteBatch::new(vec![point], Utc::now());

        let encoded = encode_line_protocol(&batch);
        assert!(encoded.starts_with("home_assistant_events_hourly,entity_id=sensor.power mean=42"));
    }
}
