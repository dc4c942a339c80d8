//! Hub endpoint list and failover bookkeeping.

use std::time::Instant;

use telemetry_config::IngestionConfig;

/// One configured hub endpoint, ordered by priority (0 = primary).
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub priority: u8,
    pub url: String,
    pub token: String,
}

/// Tracks which endpoint is currently active and when it's time to probe
/// back toward the highest-priority one.
pub struct EndpointTable {
    endpoints: Vec<Endpoint>,
    active_index: usize,
    last_switch: Instant,
}

impl EndpointTable {
    pub fn from_config(config: &IngestionConfig) -> Self {
        let mut endpoints = vec![Endpoint {
            priority: 0,
            url: config.hub_url.clone(),
            token: config.hub_token.clone(),
        }];

        if let (Some(url), Some(token)) = (&config.hub_fallback_url, &config.hub_fallback_token) {
            endpoints.push(Endpoint {
                priority: 1,
                url: url.clone(),
                token: token.clone(),
            });
        }

        Self {
            endpoints,
            active_index: 0,
            last_switch: Instant::now(),
        }
    }

    pub fn active(&self) -> &Endpoint {
        &self.endpoints[self.active_index]
    }

    pub fn is_primary_active(&self) -> bool {
        self.active_index == 0
    }

    /// Rotate to the next endpoint after a hard failure (auth_invalid, or
    /// repeated connect failures within the backoff ceiling).
    pub fn rotate(&mut self) {
        if self.endpoints.len() > 1 {
            self.active_index = (self.active_index + 1) % self.endpoints.len();
        }
        self.last_switch = Instant::now();
    }

    /// True once `reconnect_to_primary_interval` has elapsed since we last
    /// switched away from the primary endpoint.
    pub fn should_probe_primary(&self, reconnect_to_primary_interval: std::time::Duration) -> bool {
        !self.is_primary_active() && self.last_switch.elapsed() >= reconnect_to_primary_interval
    }

    /// Switch back to the highest-priority endpoint after a successful probe.
    pub fn switch_to_primary(&mut self) {
        self.active_index = 0;
        self.last_switch = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_fallback() -> EndpointTable {
        EndpointTable {
            endpoints: vec![
                Endpoint {
                    priority: 0,
                    url: "wss://primary".into(),
                    token: "t1".into(),
                },
                Endpoint {
                    priority: 1,
                    url: "wss://fallback".into(),
                    token: "t2".into(),
                },
            ],
            active_index: 0,
            last_switch: Instant::now(),
        }
    }

    #[test]
    fn rotate_advances_to_fallback_and_wraps() {
        let mut table = table_with_fallback();
        assert!(table.is_primary_active());
        table.rotate();
        assert_eq!(table.active().url, "wss://fallback");
        table.rotate();
        assert_eq!(table.active().url, "wss://primary");
    }

    #[test]
    fn switch_to_primary_resets_active_index() {
        let mut table = table_with_fallback();
        table.rotate();
        assert!(!table.is_primary_active());
        table.switch_to_primary();
        assert!(table.is_primary_active());
    }
}
