//! Shared polling-provider framework: a `DashMap`-backed single-slot
//! cache, a `governor` token bucket sized from `rate_limit_per_minute`, and
//! a single-flight guard so overlapping forced refreshes collapse into one
//! in-flight fetch.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Serialize;
use telemetry_domain::{ProviderFields, ProviderKind, ProviderReading};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub type FetchFn<T> = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

struct CacheEntry<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub poll_count: u64,
    pub failure_count: u64,
    pub cache_hit_rate: f64,
    pub ttl_seconds: u64,
    pub stale: bool,
}

/// Polls an upstream on its own timer and serves the last successful
/// reading from a single-slot cache, marking it `stale` once past `ttl`.
pub struct PollingProvider<T: Clone + Send + Sync + 'static> {
    kind: ProviderKind,
    fetch: FetchFn<T>,
    cache: DashMap<String, CacheEntry<T>>,
    ttl: Duration,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    single_flight: Mutex<()>,
    poll_count: AtomicU64,
    failure_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    last_success_at: StdMutex<Option<DateTime<Utc>>>,
    last_error: StdMutex<Option<String>>,
}

impl<T: Clone + Send + Sync + 'static + Into<ProviderFields>> PollingProvider<T> {
    pub fn new(kind: ProviderKind, fetch: FetchFn<T>, ttl: Duration, rate_limit_per_minute: u32) -> Arc<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit_per_minute.max(1)).unwrap());
        Arc::new(Self {
            kind,
            fetch,
            cache: DashMap::new(),
            ttl,
            rate_limiter: RateLimiter::direct(quota),
            single_flight: Mutex::new(()),
            poll_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            last_success_at: StdMutex::new(None),
            last_error: StdMutex::new(None),
        })
    }

    /// Spawn the background polling loop for `key`; returns immediately.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        key: impl Into<String>,
        refresh_every: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let this = self.clone();
        let key = key.into();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => this.poll_once(&key).await,
                    _ = shutdown_rx.recv() => return,
                }
            }
        });
    }

    /// Fetch once and update the cache, respecting the rate limiter and
    /// collapsing concurrent calls into a single in-flight fetch.
    pub async fn poll_once(&self, key: &str) {
        let _guard = self.single_flight.lock().await;

        if self.rate_limiter.check().is_err() {
            warn!(provider = ?self.kind, "provider poll skipped, rate limit exceeded");
            return;
        }

        self.poll_count.fetch_add(1, Ordering::Relaxed);
        match (self.fetch)().await {
            Ok(value) => {
                let now = Utc::now();
                self.cache.insert(key.to_string(), CacheEntry { value, fetched_at: now });
                *self.last_success_at.lock().unwrap() = Some(now);
                *self.last_error.lock().unwrap() = None;
                info!(provider = ?self.kind, "provider poll succeeded");
            }
            Err(err) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                *self.last_error.lock().unwrap() = Some(err.to_string());
                warn!(provider = ?self.kind, error = %err, "provider poll failed, serving stale cache if present");
            }
        }
    }

    /// Non-blocking read of the cached reading for `key`; never performs
    /// network I/O.
    pub fn latest(&self, key: &str) -> Option<ProviderReading> {
        match self.cache.get(key) {
            Some(entry) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                let stale = Utc::now().signed_duration_since(entry.fetched_at)
                    > chrono::Duration::from_std(self.ttl).unwrap_or_default();
                Some(ProviderReading {
                    timestamp: entry.fetched_at,
                    fields: entry.value.clone().into(),
                    stale,
                })
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn health(&self, key: &str) -> ProviderHealth {
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total = hits + misses;
        let cache_hit_rate = if total == 0 { 0.0 } else { hits as f64 / total as f64 };

        let stale = match self.cache.get(key) {
            Some(entry) => {
                Utc::now().signed_duration_since(entry.fetched_at)
                    > chrono::Duration::from_std(self.ttl).unwrap_or_default()
            }
            None => true,
        };

        ProviderHealth {
            last_success_at: *self.last_success_at.lock().unwrap(),
            last_error: self.last_error.lock().unwrap().clone(),
            poll_count: self.poll_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            cache_hit_rate,
            ttl_seconds: self.ttl.as_secs(),
            stale,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_domain::WeatherFields;

    fn sample_fetch(fail: Arc<std::sync::atomic::AtomicBool>) -> FetchFn<WeatherFields> {
        Box::new(move || {
            let fail = fail.clone();
            Box::pin(async move {
                if fail.load(Ordering::Relaxed) {
                    anyhow::bail!("upstream unreachable")
                } else {
                    Ok(WeatherFields {
                        temperature_c: 10.0,
                        humidity_pct: 50.0,
                        pressure_hpa: 1010.0,
                        wind_speed_ms: 1.0,
                        condition: "Clear".to_string(),
                        description: "clear sky".to_string(),
                    })
                }
            })
        })
    }

    #[tokio::test]
    async fn successful_poll_populates_cache_as_fresh() {
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let provider = PollingProvider::new(
            ProviderKind::Weather,
            sample_fetch(fail),
            Duration::from_secs(60),
            30,
        );
        provider.poll_once("home").await;
        let reading = provider.latest("home").expect("reading present");
        assert!(!reading.stale);
    }

    #[tokio::test]
    async fn failed_poll_retains_previous_reading_as_stale_fallback() {
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let provider = PollingProvider::new(
            ProviderKind::Weather,
            sample_fetch(fail.clone()),
            Duration::from_millis(1),
            30,
        );
        provider.poll_once("home").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        fail.store(true, Ordering::Relaxed);
        provider.poll_once("home").await;

        let reading = provider.latest("home").expect("stale reading still served");
        assert!(reading.stale);
        assert_eq!(provider.health("home").failure_count, 1);
    }

    #[tokio::test]
    async fn missing_key_reports_stale_health() {
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let provider = PollingProvider::new(
            ProviderKind::Weather,
            sample_fetch(fail),
            Duration::from_secs(60),
            30,
        );
        assert!(provider.health("home").stale);
    }
}
