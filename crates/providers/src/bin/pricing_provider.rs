use std::env;

use telemetry_config::ProviderConfig;
use tracing::{info, warn};

const SHUTDOWN_CHANNEL_SIZE: usize = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry_common::logging::init_tracing_json();

    dotenvy::dotenv().ok();
    let config = ProviderConfig::load(
        "PRICING",
        8092,
        providers::pricing::DEFAULT_REFRESH_EVERY,
        providers::pricing::DEFAULT_REFRESH_EVERY * 2,
    );
    let url = env::var("PRICING_PROVIDER_UPSTREAM_URL")
        .unwrap_or_else(|_| "https://api.example-pricing.test/v1/spot-price".to_string());

    info!("starting pricing-provider");

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(SHUTDOWN_CHANNEL_SIZE);
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received ctrl-c, initiating graceful shutdown");
            let _ = shutdown_tx_clone.send(());
        }
    });

    let provider = providers::pricing::build(url, config.ttl, config.rate_limit_per_minute);
    provider.spawn_refresh(providers::HOME_KEY, config.refresh_every, shutdown_tx.subscribe());

    let bind_addr = format!("0.0.0.0:{}", config.health_port);
    providers::health_server::serve(bind_addr, provider, providers::HOME_KEY, shutdown_tx.subscribe()).await;

    Ok(())
}
