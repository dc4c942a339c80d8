//! Electricity pricing provider. Refresh cadence 60 min.

use std::sync::Arc;
use std::time::Duration;

use telemetry_domain::{PricingFields, ProviderKind};

use crate::framework::{FetchFn, PollingProvider};

pub const DEFAULT_REFRESH_EVERY: Duration = Duration::from_secs(60 * 60);

pub fn build(url: String, ttl: Duration, rate_limit_per_minute: u32) -> Arc<PollingProvider<PricingFields>> {
    let http = reqwest::Client::new();
    let fetch: FetchFn<PricingFields> = Box::new(move || {
        let http = http.clone();
        let url = url.clone();
        Box::pin(async move { fetch_pricing(&http, &url).await })
    });

    PollingProvider::new(ProviderKind::Pricing, fetch, ttl, rate_limit_per_minute)
}

async fn fetch_pricing(http: &reqwest::Client, url: &str) -> anyhow::Result<PricingFields> {
    let response = http.get(url).send().await?.error_for_status()?;
    let fields = response.json::<PricingFields>().await?;
    Ok(fields)
}
