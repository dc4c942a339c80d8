//! Retention tier definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
    Archive,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Warm => "warm",
            Tier::Cold => "cold",
            Tier::Archive => "archive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationFn {
    Count,
    Mean,
    Min,
    Max,
    Last,
}

/// A retention tier: source/destination measurement, downsample window,
/// retention horizon, and the aggregation functions applied when moving
/// into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionTier {
    pub tier: Tier,
    pub source_measurement: String,
    pub destination_measurement: String,
    #[serde(with = "duration_secs")]
    pub downsample_window: Duration,
    #[serde(with = "duration_secs")]
    pub retention_horizon: Duration,
    pub aggregation_functions: Vec<AggregationFn>,
}

impl RetentionTier {
    /// The four default tiers.
    pub fn defaults() -> Vec<RetentionTier> {
        vec![
            RetentionTier {
                tier: Tier::Hot,
                source_measurement: "home_assistant_events".to_string(),
                destination_measurement: "home_assistant_events".to_string(),
                downsample_window: Duration::from_secs(0),
                retention_horizon: Duration::from_secs(7 * 24 * 3600),
                aggregation_functions: vec![],
            },
            RetentionTier {
                tier: Tier::Warm,
                source_measurement: "home_assistant_events".to_string(),
                destination_measurement: "home_assistant_events_hourly".to_string(),
                downsample_window: Duration::from_secs(3600),
                retention_horizon: Duration::from_secs(90 * 24 * 3600),
                aggregation_functions: vec![
                    AggregationFn::Count,
                    AggregationFn::Mean,
                    AggregationFn::Min,
                    AggregationFn::Max,
                    AggregationFn::Last,
                ],
            },
            RetentionTier {
                tier: Tier::Cold,
                source_measurement: "home_assistant_events_hourly".to_string(),
                destination_measurement: "home_assistant_events_daily".to_string(),
                downsample_window: Duration::from_secs(24 * 3600),
                retention_horizon: Duration::from_secs(365 * 24 * 3600),
                aggregation_functions: vec![
                    AggregationFn::Count,
                    AggregationFn::Mean,
                    AggregationFn::Min,
                    AggregationFn::Max,
                    AggregationFn::Last,
                ],
            },
            RetentionTier {
                tier: Tier::Archive,
                source_measurement: "home_assistant_events_daily".to_string(),
                destination_measurement: "archive".to_string(),
                downsample_window: Duration::from_secs(24 * 3600),
                retention_horizon: Duration::from_secs(5 * 365 * 24 * 3600),
                aggregation_functions: vec![],
            },
        ]
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_horizons() {
        let tiers = RetentionTier::defaults();
        assert_eq!(tiers.len(), 4);
        assert_eq!(tiers[0].retention_horizon, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(tiers[3].retention_horizon, Duration::from_secs(5 * 365 * 24 * 3600));
    }
}
