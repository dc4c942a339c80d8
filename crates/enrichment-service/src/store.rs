//! TimeSeriesStore HTTP client: a small struct wrapping a configured
//! `reqwest::Client`, constructed once from config and cloned into
//! workers. Speaks InfluxDB's line protocol for writes and its Flux query
//! language for range/filter reads.

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

    /// POST a `WriteBatch` as newline-delimited InfluxDB line protocol to
    /// `{url}/api/v2/write?org={org}&bucket={bucket}`.
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
            Err(Error::Transient(format!(
                "store write returned {}",
                response.status()
            )))
        } else {
            Err(Error::Store(format!(
                "store rejected write: {}",
                response.status()
            )))
        }
    }

    /// Run a Flux query against `{url}/api/v2/query`, returning the raw
    /// CSV response body (the retention engine parses it further).
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
            return Err(Error::Store(format!(
                "store rejected query: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|err| Error::Store(format!("failed to read query response: {err}")))
    }
}

/// Encode a `WriteBatch` as InfluxDB line protocol: one line per point,
/// `measurement,tag=val,... field=val,... timestamp_ns`.
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
    value
        .replace(' ', "\\ ")
        .replace(',', "\\,")
        .replace('=', "\\=")
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
        let point = TimeSeriesPoint::new("home_assistant_events", Utc::now())
            .tag(TagKey::EntityId, "light.kitchen")
            .field("state", "on");
        let batch = WriteBatch::new(vec![point], Utc::now());

        let encoded = encode_line_protocol(&batch);
        assert!(encoded.starts_with("home_assistant_events,entity_id=light.kitchen state=\"on\""));
    }

    #[test]
    fn escapes_spaces_and_commas_in_tag_values() {
        let point = TimeSeriesPoint::new("home_assistant_events", Utc::now())
            .tag(TagKey::AreaId, "living room, den")
            .field("state", "on");
        let batch = WriteBatch::new(vec![point], Utc::now());

        let encoded = encode_line_protocol(&batch);
        assert!(encoded.contains("area_id=living\\ room\\,\\ den"));
    }
}
