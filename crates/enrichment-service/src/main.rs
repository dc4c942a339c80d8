use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use telemetry_config::EnrichmentConfig;
use telemetry_domain::ProviderKind;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

mod batch;
mod enrich;
mod health;
mod normalize;
mod server;
mod shape;
mod store;
mod validate;
mod metrics;

const SHUTDOWN_CHANNEL_SIZE: usize = 16;
/// How often this service re-polls each provider's `GET /latest` cache.
const PROVIDER_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry_common::logging::init_tracing_json();

    let config = Arc::new(EnrichmentConfig::load()?);
    info!("starting enrichment-service");

    let (shutdown_tx, _) = broadcast::channel::<()>(SHUTDOWN_CHANNEL_SIZE);
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received ctrl-c, initiating graceful shutdown");
            let _ = shutdown_tx_clone.send(());
        }
    });

    let providers: Vec<Arc<dyn enrich::ProviderClient>> = [
        (ProviderKind::Weather, config.provider_urls.weather.clone()),
        (ProviderKind::Carbon, config.provider_urls.carbon.clone()),
        (ProviderKind::Pricing, config.provider_urls.pricing.clone()),
        (ProviderKind::AirQuality, config.provider_urls.air_quality.clone()),
        (ProviderKind::Calendar, config.provider_urls.calendar.clone()),
        (ProviderKind::SmartMeter, config.provider_urls.smart_meter.clone()),
    ]
    .into_iter()
    .map(|(kind, url)| {
        let client = Arc::new(enrich::HttpProviderClient::new(kind, url));
        client.spawn_refresh(PROVIDER_REFRESH_INTERVAL, shutdown_tx.subscribe());
        client as Arc<dyn enrich::ProviderClient>
    })
    .collect();

    let store_client = Arc::new(store::StoreClient::new(&config.store));
    let batch_writer = batch::BatchWriter::new(store_client, config.dead_letter_path.clone());

    let (points_tx, points_rx) = mpsc::channel(config.intake_queue);

    let batch_writer_handle = tokio::spawn(batch_writer.clone().run(
        points_rx,
        config.batch_size,
        config.batch_timeout,
        config.flush_timeout,
        shutdown_tx.subscribe(),
    ));

    let validation_errors = Arc::new(AtomicU64::new(0));
    let events_accepted = Arc::new(AtomicU64::new(0));
    let events_saturated = Arc::new(AtomicU64::new(0));

    let app_state = server::AppState {
        points_tx: points_tx.clone(),
        intake_capacity: config.intake_queue,
        providers,
        correlation_header_name: config.correlation_header_name.clone(),
        validation_errors: validation_errors.clone(),
        events_accepted: events_accepted.clone(),
        events_saturated: events_saturated.clone(),
    };

    let health_state = health::HealthState {
        points_tx: points_tx.clone(),
        intake_capacity: config.intake_queue,
        batch_writer: batch_writer.clone(),
        validation_errors: validation_errors.clone(),
        events_accepted: events_accepted.clone(),
        events_saturated: events_saturated.clone(),
    };

    let server_handle = tokio::spawn(server::serve(
        config.bind_addr.clone(),
        app_state,
        health_state,
        shutdown_tx.subscribe(),
    ));

    let mut shutdown_rx = shutdown_tx.subscribe();
    let _ = shutdown_rx.recv().await;

    info!("waiting for enrichment-service tasks to drain");
    drop(points_tx);
    let drain = tokio::time::timeout(config.graceful_drain_timeout, async {
        for (name, handle) in [("server", server_handle), ("batch_writer", batch_writer_handle)] {
            if let Err(err) = handle.await {
                error!(task = name, error = %err, "enrichment-service task panicked");
            }
        }
    });
    if drain.await.is_err() {
        warn!("graceful drain timeout elapsed before all tasks finished");
    }

    info!("enrichment-service shutdown complete");
    Ok(())
}
