//! Configuration loading for the telemetry pipeline's services.
//!
//! Each service owns its own config struct, loaded once at startup from
//! environment variables (via `dotenvy::dotenv()` then `std::env`); there is
//! no hot-reload. Missing required keys are fatal — a service must exit
//! non-zero on startup rather than run partially configured.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

fn env_var(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool_or(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(env_parse_or(key, default))
}

/// `crates/ingestion-client`'s configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    pub hub_url: String,
    pub hub_token: String,
    pub hub_fallback_url: Option<String>,
    pub hub_fallback_token: Option<String>,
    pub reconnect_to_primary_interval: Duration,

    pub queue_capacity: usize,
    pub dispatch_workers: usize,
    pub dispatch_retries: u32,
    pub event_silence_threshold: Duration,

    pub enrichment_url: String,
    pub health_port: u16,
}

impl IngestionConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            hub_url: env_var("HUB_URL")?,
            hub_token: env_var("HUB_TOKEN")?,
            hub_fallback_url: env_opt("HUB_FALLBACK_URL"),
            hub_fallback_token: env_opt("HUB_FALLBACK_TOKEN"),
            reconnect_to_primary_interval: secs("RECONNECT_TO_PRIMARY_INTERVAL", 60),

            queue_capacity: env_parse_or("QUEUE_CAPACITY", 10_000),
            dispatch_workers: env_parse_or("DISPATCH_WORKERS", 4),
            dispatch_retries: env_parse_or("DISPATCH_RETRIES", 3),
            event_silence_threshold: secs("EVENT_SILENCE_THRESHOLD", 120),

            enrichment_url: env::var("ENRICHMENT_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8081".to_string()),
            health_port: env_parse_or("INGESTION_HEALTH_PORT", 8080),
        })
    }
}

/// `crates/enrichment-service`'s configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub intake_queue: usize,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub flush_timeout: Duration,
    pub graceful_drain_timeout: Duration,
    pub dead_letter_path: String,

    pub provider_urls: ProviderUrls,

    pub store: StoreConfig,

    pub bind_addr: String,
    pub correlation_header_name: String,
}

/// The read-side URLs the enrichment stage polls for each provider's
/// `GET /latest`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUrls {
    pub weather: String,
    pub carbon: String,
    pub pricing: String,
    pub air_quality: String,
    pub calendar: String,
    pub smart_meter: String,
}

impl EnrichmentConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            intake_queue: env_parse_or("INTAKE_QUEUE", 10_000),
            batch_size: env_parse_or("BATCH_SIZE", 500),
            batch_timeout: secs("BATCH_TIMEOUT", 5),
            flush_timeout: secs("FLUSH_TIMEOUT", 10),
            graceful_drain_timeout: secs("GRACEFUL_DRAIN_TIMEOUT", 30),
            dead_letter_path: env::var("DEAD_LETTER_PATH")
                .unwrap_or_else(|_| "dead_letter.ndjson".to_string()),

            provider_urls: ProviderUrls {
                weather: env::var("WEATHER_PROVIDER_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8090".to_string()),
                carbon: env::var("CARBON_PROVIDER_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8091".to_string()),
                pricing: env::var("PRICING_PROVIDER_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8092".to_string()),
                air_quality: env::var("AIR_QUALITY_PROVIDER_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8093".to_string()),
                calendar: env::var("CALENDAR_PROVIDER_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8094".to_string()),
                smart_meter: env::var("SMART_METER_PROVIDER_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8095".to_string()),
            },

            store: StoreConfig::load()?,

            bind_addr: env::var("ENRICHMENT_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8081".to_string()),
            correlation_header_name: env::var("CORRELATION_HEADER_NAME")
                .unwrap_or_else(|_| "x-correlation-id".to_string()),
        })
    }
}

/// TimeSeriesStore connection settings, shared by the enrichment service
/// and the retention engine.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub write_timeout: Duration,
}

impl StoreConfig {
    pub fn load() -> Result<Self> {
        Ok(Self {
            url: env_var("STORE_URL")?,
            token: env_var("STORE_TOKEN")?,
            org: env::var("STORE_ORG").unwrap_or_else(|_| "home".to_string()),
            bucket: env::var("STORE_BUCKET").unwrap_or_else(|_| "telemetry".to_string()),
            write_timeout: secs("STORE_WRITE_TIMEOUT", 10),
        })
    }
}

/// Per-provider configuration shared by all six provider binaries;
/// `credentials`/`url` are read directly by each binary since the key
/// names differ per upstream API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub refresh_every: Duration,
    pub ttl: Duration,
    pub rate_limit_per_minute: u32,
    pub health_port: u16,
}

impl ProviderConfig {
    /// Load the common provider knobs, namespaced by an upper-case prefix
    /// such as `WEATHER` (producing `WEATHER_ENABLED`, `WEATHER_REFRESH_EVERY`, ...).
    /// `default_health_port` is 8090-8095 by provider identity; `default_refresh_every`
    /// is the provider's own polling cadence (10 min weather, 15 min
    /// carbon/calendar, 60 min pricing/air-quality, 5 min smart-meter). The TTL
    /// default is conventionally `2 * default_refresh_every`.
    pub fn load(
        prefix: &str,
        default_health_port: u16,
        default_refresh_every: Duration,
        default_ttl: Duration,
    ) -> Self {
        Self {
            enabled: env_bool_or(&format!("{prefix}_ENABLED"), true),
            refresh_every: secs(&format!("{prefix}_REFRESH_EVERY"), default_refresh_every.as_secs()),
            ttl: secs(&format!("{prefix}_TTL"), default_ttl.as_secs()),
            rate_limit_per_minute: env_parse_or(&format!("{prefix}_RATE_LIMIT_PER_MINUTE"), 30),
            health_port: env_parse_or(&format!("{prefix}_HEALTH_PORT"), default_health_port),
        }
    }
}

/// `crates/retention-engine`'s configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    pub store: StoreConfig,
    pub object_store_url: String,
    pub object_store_prefix: String,
    pub object_store_credentials: Option<String>,
    pub bind_addr: String,
}

impl RetentionConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            store: StoreConfig::load()?,
            object_store_url: env_var("OBJECT_STORE_URL")?,
            object_store_prefix: env::var("OBJECT_STORE_PREFIX")
                .unwrap_or_else(|_| "telemetry-archive".to_string()),
            object_store_credentials: env_opt("OBJECT_STORE_CREDENTIALS"),
            bind_addr: env::var("RETENTION_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8082".to_string()),
        })
    }
}

/// Shared logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_level: String,
    pub correlation_header_name: String,
    pub json: bool,
}

impl LoggingConfig {
    pub fn load() -> Self {
        Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            correlation_header_name: env::var("CORRELATION_HEADER_NAME")
                .unwrap_or_else(|_| "x-correlation-id".to_string()),
            json: env_bool_or("LOG_JSON", false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_config_applies_prefix_and_defaults() {
        env::remove_var("WEATHER_ENABLED");
        env::remove_var("WEATHER_TTL");
        let cfg = ProviderConfig::load(
            "WEATHER",
            8090,
            Duration::from_secs(600),
            Duration::from_secs(1200),
        );
        assert!(cfg.enabled);
        assert_eq!(cfg.ttl, Duration::from_secs(1200));
        assert_eq!(cfg.refresh_every, Duration::from_secs(600));
        assert_eq!(cfg.health_port, 8090);
    }

    #[test]
    fn provider_config_respects_overrides() {
        env::set_var("CARBON_ENABLED", "false");
        env::set_var("CARBON_TTL", "60");
        let cfg = ProviderConfig::load(
            "CARBON",
            8091,
            Duration::from_secs(900),
            Duration::from_secs(1800),
        );
        assert!(!cfg.enabled);
        assert_eq!(cfg.ttl, Duration::from_secs(60));
        env::remove_var("CARBON_ENABLED");
        env::remove_var("CARBON_TTL");
    }
}
