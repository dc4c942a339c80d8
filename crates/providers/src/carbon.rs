//! Carbon intensity provider. Refresh cadence 15 min.

use std::sync::Arc;
use std::time::Duration;

use telemetry_domain::{CarbonFields, ProviderKind};

use crate::framework::{FetchFn, PollingProvider};

pub const DEFAULT_REFRESH_EVERY: Duration = Duration::from_secs(15 * 60);

pub fn build(url: String, ttl: Duration, rate_limit_per_minute: u32) -> Arc<PollingProvider<CarbonFields>> {
    let http = reqwest::Client::new();
    let fetch: FetchFn<CarbonFields> = Box::new(move || {
        let http = http.clone();
        let url = url.clone();
        Box::pin(async move { fetch_carbon(&http, &url).await })
    });

    PollingProvider::new(ProviderKind::Carbon, fetch, ttl, rate_limit_per_minute)
}

async fn fetch_carbon(http: &reqwest::Client, url: &str) -> anyhow::Result<CarbonFields> {
    let response = http.get(url).send().await?.error_for_status()?;
    let fields = response.json::<CarbonFields>().await?;
    Ok(fields)
}
