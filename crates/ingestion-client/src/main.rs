use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use telemetry_config::IngestionConfig;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

mod client;
mod dispatch;
mod endpoint;
mod frame;
mod health;
mod metrics;

const SHUTDOWN_CHANNEL_SIZE: usize = 16;
const RAW_EVENT_CHANNEL_SIZE: usize = 1_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry_common::logging::init_tracing_json();

    let config = Arc::new(IngestionConfig::load()?);
    info!("starting ingestion-client");

    let (shutdown_tx, _) = broadcast::channel::<()>(SHUTDOWN_CHANNEL_SIZE);
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received ctrl-c, initiating graceful shutdown");
            let _ = shutdown_tx_clone.send(());
        }
    });

    let health = client::SharedHealth::new();
    let queue = dispatch::DispatchQueue::new(config.queue_capacity);
    let dispatch_failed_events = Arc::new(AtomicU64::new(0));

    let (raw_event_tx, mut raw_event_rx) = mpsc::channel(RAW_EVENT_CHANNEL_SIZE);

    let client_handle = tokio::spawn(client::run(
        config.clone(),
        raw_event_tx,
        health.clone(),
        shutdown_tx.subscribe(),
    ));

    let feed_queue = queue.clone();
    let feeder_handle = tokio::spawn(async move {
        while let Some(event) = raw_event_rx.recv().await {
            feed_queue.push(event).await;
        }
    });

    let dispatch_handle = tokio::spawn(dispatch::run_workers(
        queue.clone(),
        config.clone(),
        dispatch_failed_events.clone(),
        shutdown_tx.subscribe(),
    ));

    let health_handle = tokio::spawn(health::serve(
        config.clone(),
        health.clone(),
        queue.clone(),
        dispatch_failed_events.clone(),
        shutdown_tx.subscribe(),
    ));

    let mut shutdown_rx = shutdown_tx.subscribe();
    let _ = shutdown_rx.recv().await;

    info!("waiting for ingestion-client tasks to drain");
    for (name, handle) in [
        ("client", client_handle),
        ("feeder", feeder_handle),
        ("dispatch", dispatch_handle),
        ("health", health_handle),
    ] {
        if let Err(err) = handle.await {
            error!(task = name, error = %err, "ingestion-client task panicked");
        }
    }

    info!("ingestion-client shutdown complete");
    Ok(())
}
