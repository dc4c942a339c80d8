//! Air quality provider. Refresh cadence 60 min.

use std::sync::Arc;
use std::time::Duration;

use telemetry_domain::{AirQualityFields, ProviderKind};

use crate::framework::{FetchFn, PollingProvider};

pub const DEFAULT_REFRESH_EVERY: Duration = Duration::from_secs(60 * 60);

pub fn build(url: String, ttl: Duration, rate_limit_per_minute: u32) -> Arc<PollingProvider<AirQualityFields>> {
    let http = reqwest::Client::new();
    let fetch: FetchFn<AirQualityFields> = Box::new(move || {
        let http = http.clone();
        let url = url.clone();
        Box::pin(async move { fetch_air_quality(&http, &url).await })
    });

    PollingProvider::new(ProviderKind::AirQuality, fetch, ttl, rate_limit_per_minute)
}

async fn fetch_air_quality(http: &reqwest::Client, url: &str) -> anyhow::Result<AirQualityFields> {
    let response = http.get(url).send().await?.error_for_status()?;
    let fields = response.json::<AirQualityFields>().await?;
    Ok(fields)
}
