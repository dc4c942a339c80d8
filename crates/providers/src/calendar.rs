//! Occupancy calendar provider. Refresh cadence 15 min.

use std::sync::Arc;
use std::time::Duration;

use telemetry_domain::{CalendarFields, ProviderKind};

use crate::framework::{FetchFn, PollingProvider};

pub const DEFAULT_REFRESH_EVERY: Duration = Duration::from_secs(15 * 60);

pub fn build(url: String, ttl: Duration, rate_limit_per_minute: u32) -> Arc<PollingProvider<CalendarFields>> {
    let http = reqwest::Client::new();
    let fetch: FetchFn<CalendarFields> = Box::new(move || {
        let http = http.clone();
        let url = url.clone();
        Box::pin(async move { fetch_calendar(&http, &url).await })
    });

    PollingProvider::new(ProviderKind::Calendar, fetch, ttl, rate_limit_per_minute)
}

async fn fetch_calendar(http: &reqwest::Client, url: &str) -> anyhow::Result<CalendarFields> {
    let response = http.get(url).send().await?.error_for_status()?;
    let fields = response.json::<CalendarFields>().await?;
    Ok(fields)
}
