//! Smart meter provider. Refresh cadence 5 min.

use std::sync::Arc;
use std::time::Duration;

use telemetry_domain::{ProviderKind, SmartMeterFields};

use crate::framework::{FetchFn, PollingProvider};

pub const DEFAULT_REFRESH_EVERY: Duration = Duration::from_secs(5 * 60);

pub fn build(url: String, ttl: Duration, rate_limit_per_minute: u32) -> Arc<PollingProvider<SmartMeterFields>> {
    let http = reqwest::Client::new();
    let fetch: FetchFn<SmartMeterFields> = Box::new(move || {
        let http = http.clone();
        let url = url.clone();
        Box::pin(async move { fetch_smart_meter(&http, &url).await })
    });

    PollingProvider::new(ProviderKind::SmartMeter, fetch, ttl, rate_limit_per_minute)
}

async fn fetch_smart_meter(http: &reqwest::Client, url: &str) -> anyhow::Result<SmartMeterFields> {
    let response = http.get(url).send().await?.error_for_status()?;
    let fields = response.json::<SmartMeterFields>().await?;
    Ok(fields)
}
