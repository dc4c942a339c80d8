//! Retention engine binary: downsample, tier-move, archive, refresh
//! materialized views, and sample analytics on their own schedules,
//! reporting per-job health on an axum server.

mod analytics_collector;
mod archiver;
mod downsample;
mod flux;
mod health;
mod materialized_view;
mod scheduler;
mod store;
mod tier_mover;

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use telemetry_config::RetentionConfig;
use telemetry_domain::{RetentionTier, Tier};
use tokio::sync::broadcast;
use tracing::{info, warn};

const SHUTDOWN_CHANNEL_SIZE: usize = 16;
const DOWNSAMPLE_INTERVAL: Duration = Duration::from_secs(3600);
const TIER_MOVE_INTERVAL: Duration = Duration::from_secs(24 * 3600);
const ARCHIVE_INTERVAL: Duration = Duration::from_secs(24 * 3600);
const MATERIALIZED_VIEW_INTERVAL: Duration = Duration::from_secs(3600);
const ANALYTICS_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry_common::logging::init_tracing_json();

    let config = RetentionConfig::load()?;
    info!("starting retention-engine");

    let (shutdown_tx, _) = broadcast::channel::<()>(SHUTDOWN_CHANNEL_SIZE);
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received ctrl-c, initiating graceful shutdown");
            let _ = shutdown_tx_clone.send(());
        }
    });

    let store_client = store::StoreClient::new(&config.store);
    let object_store = std::sync::Arc::new(archiver::ObjectStoreClient::new(
        config.object_store_url.clone(),
        config.object_store_prefix.clone(),
        config.object_store_credentials.clone(),
    ));

    let tiers = RetentionTier::defaults();
    let warm_tier = tiers
        .iter()
        .find(|t| matches!(t.tier, Tier::Warm))
        .cloned()
        .expect("warm tier must be present in RetentionTier::defaults()");
    let cold_tier = tiers
        .iter()
        .find(|t| matches!(t.tier, Tier::Cold))
        .cloned()
        .expect("cold tier must be present in RetentionTier::defaults()");
    let archive_tier = tiers
        .iter()
        .find(|t| matches!(t.tier, Tier::Archive))
        .cloned()
        .expect("archive tier must be present in RetentionTier::defaults()");

    let registry = scheduler::new_registry();

    let mut handles = Vec::new();

    {
        let store_client = store_client.clone();
        let registry = registry.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            scheduler::run_job(
                "downsample",
                DOWNSAMPLE_INTERVAL,
                registry,
                move || {
                    let store_client = store_client.clone();
                    let warm_tier = warm_tier.clone();
                    async move { downsample::run(&store_client, &warm_tier, chrono::Utc::now()).await }
                },
                shutdown_rx,
            )
            .await
        }));
    }

    {
        let store_client = store_client.clone();
        let registry = registry.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            scheduler::run_job(
                "tier_move",
                TIER_MOVE_INTERVAL,
                registry,
                move || {
                    let store_client = store_client.clone();
                    let cold_tier = cold_tier.clone();
                    async move { tier_mover::run(&store_client, &cold_tier, chrono::Utc::now()).await }
                },
                shutdown_rx,
            )
            .await
        }));
    }

    {
        let store_client = store_client.clone();
        let object_store = object_store.clone();
        let registry = registry.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            scheduler::run_job(
                "archive",
                ARCHIVE_INTERVAL,
                registry,
                move || {
                    let store_client = store_client.clone();
                    let object_store = object_store.clone();
                    let archive_tier = archive_tier.clone();
                    async move { archiver::run(&store_client, &object_store, &archive_tier, chrono::Utc::now()).await }
                },
                shutdown_rx,
            )
            .await
        }));
    }

    {
        let store_client = store_client.clone();
        let registry = registry.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            scheduler::run_job(
                "materialized_views",
                MATERIALIZED_VIEW_INTERVAL,
                registry,
                move || {
                    let store_client = store_client.clone();
                    async move { materialized_view::run(&store_client, chrono::Utc::now()).await }
                },
                shutdown_rx,
            )
            .await
        }));
    }

    {
        let store_client = store_client.clone();
        let registry = registry.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            scheduler::run_job(
                "analytics_collector",
                ANALYTICS_INTERVAL,
                registry,
                move || {
                    let store_client = store_client.clone();
                    async move { analytics_collector::run(&store_client).await }
                },
                shutdown_rx,
            )
            .await
        }));
    }

    let health_state = health::HealthState { jobs: registry.clone() };
    let app = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    let bind_addr = config.bind_addr.clone();
    let mut shutdown_rx = shutdown_tx.subscribe();
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
    });

    let mut shutdown_rx = shutdown_tx.subscribe();
    shutdown_rx.recv().await.ok();

    let _ = server_handle.await;
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
