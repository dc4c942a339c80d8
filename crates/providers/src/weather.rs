//! Weather provider: queries a location-keyed external HTTP API.
//! Refresh cadence 10 min.

use std::sync::Arc;
use std::time::Duration;

use telemetry_domain::{ProviderKind, WeatherFields};

use crate::framework::{FetchFn, PollingProvider};

pub const DEFAULT_REFRESH_EVERY: Duration = Duration::from_secs(10 * 60);

pub fn build(url: String, ttl: Duration, rate_limit_per_minute: u32) -> Arc<PollingProvider<WeatherFields>> {
    let http = reqwest::Client::new();
    let fetch: FetchFn<WeatherFields> = Box::new(move || {
        let http = http.clone();
        let url = url.clone();
        Box::pin(async move { fetch_weather(&http, &url).await })
    });

    PollingProvider::new(ProviderKind::Weather, fetch, ttl, rate_limit_per_minute)
}

async fn fetch_weather(http: &reqwest::Client, url: &str) -> anyhow::Result<WeatherFields> {
    let response = http.get(url).send().await?.error_for_status()?;
    let fields = response.json::<WeatherFields>().await?;
    Ok(fields)
}
