//! The enricher: attach the latest cached provider readings to a
//! `NormalizedEvent`, never blocking on network I/O in the hot path. Each
//! provider's cache is reached through a narrow `ProviderClient` interface
//! backed by a `reqwest`-polled local snapshot.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use telemetry_domain::{EnrichedEvent, NormalizedEvent, ProviderKind, ProviderReading, ProviderSnapshot};
use tokio::sync::broadcast;
use tracing::warn;

/// The single location/key this deployment enriches against; a
/// single-home deployment has exactly one.
pub const HOME_KEY: &str = "home";

/// A read-only view onto one provider's latest reading, keyed by
/// location/key string. Implementations must never perform network I/O on
/// `latest()` — only cache reads.
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;
    fn latest(&self, key: &str) -> Option<ProviderReading>;
}

/// Polls a provider's `GET /latest` on its own timer and serves the last
/// successful response from an in-memory slot — the enrichment hot path
/// never waits on this HTTP call.
pub struct HttpProviderClient {
    kind: ProviderKind,
    url: String,
    cache: Arc<DashMap<String, ProviderReading>>,
    http: reqwest::Client,
}

impl HttpProviderClient {
    pub fn new(kind: ProviderKind, url: String) -> Self {
        Self {
            kind,
            url,
            cache: Arc::new(DashMap::new()),
            http: reqwest::Client::new(),
        }
    }

    /// Spawn the background refresh loop; returns immediately.
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => this.refresh_once().await,
                    _ = shutdown_rx.recv() => return,
                }
            }
        });
    }

    async fn refresh_once(&self) {
        let url = format!("{}/latest", self.url.trim_end_matches('/'));
        match tokio::time::timeout(Duration::from_secs(30), self.http.get(&url).send()).await {
            Ok(Ok(response)) if response.status().is_success() => {
                match response.json::<ProviderReading>().await {
                    Ok(reading) => {
                        self.cache.insert(HOME_KEY.to_string(), reading);
                    }
                    Err(err) => warn!(provider = ?self.kind, error = %err, "failed to parse provider reading"),
                }
            }
            Ok(Ok(response)) => {
                warn!(provider = ?self.kind, status = %response.status(), "provider poll returned non-success status");
            }
            Ok(Err(err)) => warn!(provider = ?self.kind, error = %err, "provider poll failed"),
            Err(_) => warn!(provider = ?self.kind, "provider poll timed out"),
        }
    }
}

impl ProviderClient for HttpProviderClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn latest(&self, key: &str) -> Option<ProviderReading> {
        self.cache.get(key).map(|entry| entry.value().clone())
    }
}

/// Attach a snapshot of every configured provider's latest reading to a
/// normalized event. Snapshot values are copies taken at enrichment time,
/// not references.
pub fn enrich(event: NormalizedEvent, providers: &[Arc<dyn ProviderClient>]) -> EnrichedEvent {
    let mut snapshot = ProviderSnapshot::default();
    for provider in providers {
        if let Some(reading) = provider.latest(HOME_KEY) {
            snapshot.set(reading);
        }
    }
    EnrichedEvent::new(event, snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use telemetry_domain::{Context, EntityCategory, NormalizedState, WeatherFields};

    struct FixedProvider {
        reading: Option<ProviderReading>,
    }

    impl ProviderClient for FixedProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Weather
        }

        fn latest(&self, _key: &str) -> Option<ProviderReading> {
            self.reading.clone()
        }
    }

    fn sample_event() -> NormalizedEvent {
        NormalizedEvent {
            event_type: "state_changed".to_string(),
            entity_id: "light.kitchen".to_string(),
            domain: "light".to_string(),
            old_state: None,
            new_state: NormalizedState {
                state: "on".to_string(),
                numeric_state: None,
                attributes: Default::default(),
                last_changed: Utc::now(),
            },
            device_class: None,
            area_id: None,
            device_id: None,
            friendly_name: None,
            unit_of_measurement: None,
            integration: None,
            entity_category: EntityCategory::Regular,
            duration_in_state_seconds: None,
            time_fired: Utc::now(),
            origin: "LOCAL".to_string(),
            context: Context {
                id: "ctx-1".to_string(),
                parent_id: None,
                user_id: None,
            },
            correlation_id: telemetry_common::CorrelationId::generate(),
        }
    }

    #[test]
    fn missing_provider_is_skipped_silently() {
        let providers: Vec<Arc<dyn ProviderClient>> = vec![Arc::new(FixedProvider { reading: None })];
        let enriched = enrich(sample_event(), &providers);
        assert!(enriched.providers.weather.is_none());
    }

    #[test]
    fn present_provider_is_copied_into_snapshot() {
        let reading = ProviderReading {
            timestamp: Utc::now(),
            fields: telemetry_domain::ProviderFields::Weather(WeatherFields {
                temperature_c: 5.0,
                humidity_pct: 80.0,
                pressure_hpa: 1000.0,
                wind_speed_ms: 2.0,
                condition: "Clouds".to_string(),
                description: "overcast".to_string(),
            }),
            stale: true,
        };
        let providers: Vec<Arc<dyn ProviderClient>> = vec![Arc::new(FixedProvider {
            reading: Some(reading),
        })];
        let enriched = enrich(sample_event(), &providers);
        let weather = enriched.providers.weather.expect("weather reading present");
        assert!(weather.stale);
    }
}
