//! Provider reading types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six enrichment provider instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Weather,
    Carbon,
    Pricing,
    AirQuality,
    Calendar,
    SmartMeter,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Weather => "weather",
            ProviderKind::Carbon => "carbon",
            ProviderKind::Pricing => "pricing",
            ProviderKind::AirQuality => "air_quality",
            ProviderKind::Calendar => "calendar",
            ProviderKind::SmartMeter => "smart_meter",
        }
    }

    pub fn all() -> [ProviderKind; 6] {
        [
            ProviderKind::Weather,
            ProviderKind::Carbon,
            ProviderKind::Pricing,
            ProviderKind::AirQuality,
            ProviderKind::Calendar,
            ProviderKind::SmartMeter,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherFields {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    pub wind_speed_ms: f64,
    pub condition: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonFields {
    pub intensity_gco2_per_kwh: f64,
    pub renewable_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub price_per_kwh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingFields {
    pub price_per_kwh: f64,
    /// Forecast window, up to 24h ahead.
    pub forecast: Vec<PricePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQualityFields {
    pub aqi: u32,
    pub pollutants_ug_m3: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarFields {
    pub occupied: bool,
    pub next_event_summary: Option<String>,
    pub next_event_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartMeterFields {
    pub total_power_w: f64,
    pub circuits_power_w: HashMap<String, f64>,
}

/// The per-provider flat record of fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderFields {
    Weather(WeatherFields),
    Carbon(CarbonFields),
    Pricing(PricingFields),
    AirQuality(AirQualityFields),
    Calendar(CalendarFields),
    SmartMeter(SmartMeterFields),
}

impl From<WeatherFields> for ProviderFields {
    fn from(fields: WeatherFields) -> Self {
        ProviderFields::Weather(fields)
    }
}

impl From<CarbonFields> for ProviderFields {
    fn from(fields: CarbonFields) -> Self {
        ProviderFields::Carbon(fields)
    }
}

impl From<PricingFields> for ProviderFields {
    fn from(fields: PricingFields) -> Self {
        ProviderFields::Pricing(fields)
    }
}

impl From<AirQualityFields> for ProviderFields {
    fn from(fields: AirQualityFields) -> Self {
        ProviderFields::AirQuality(fields)
    }
}

impl From<CalendarFields> for ProviderFields {
    fn from(fields: CalendarFields) -> Self {
        ProviderFields::Calendar(fields)
    }
}

impl From<SmartMeterFields> for ProviderFields {
    fn from(fields: SmartMeterFields) -> Self {
        ProviderFields::SmartMeter(fields)
    }
}

impl ProviderFields {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderFields::Weather(_) => ProviderKind::Weather,
            ProviderFields::Carbon(_) => ProviderKind::Carbon,
            ProviderFields::Pricing(_) => ProviderKind::Pricing,
            ProviderFields::AirQuality(_) => ProviderKind::AirQuality,
            ProviderFields::Calendar(_) => ProviderKind::Calendar,
            ProviderFields::SmartMeter(_) => ProviderKind::SmartMeter,
        }
    }
}

/// A cached provider reading, timestamped at fetch time, tagged `stale`
/// when served past its TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReading {
    pub timestamp: DateTime<Utc>,
    pub fields: ProviderFields,
    pub stale: bool,
}

impl ProviderReading {
    pub fn kind(&self) -> ProviderKind {
        self.fields.kind()
    }
}

/// A snapshot of the latest readings from every provider, copied (not
/// referenced) at enrichment time into an `EnrichedEvent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub weather: Option<ProviderReading>,
    pub carbon: Option<ProviderReading>,
    pub pricing: Option<ProviderReading>,
    pub air_quality: Option<ProviderReading>,
    pub calendar: Option<ProviderReading>,
    pub smart_meter: Option<ProviderReading>,
}

impl ProviderSnapshot {
    /// Set the reading for whichever provider it belongs to.
    pub fn set(&mut self, reading: ProviderReading) {
        match reading.kind() {
            ProviderKind::Weather => self.weather = Some(reading),
            ProviderKind::Carbon => self.carbon = Some(reading),
            ProviderKind::Pricing => self.pricing = Some(reading),
            ProviderKind::AirQuality => self.air_quality = Some(reading),
            ProviderKind::Calendar => self.calendar = Some(reading),
            ProviderKind::SmartMeter => self.smart_meter = Some(reading),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_set_routes_by_kind() {
        let mut snapshot = ProviderSnapshot::default();
        snapshot.set(ProviderReading {
            timestamp: Utc::now(),
            fields: ProviderFields::Weather(WeatherFields {
                temperature_c: 21.0,
                humidity_pct: 40.0,
                pressure_hpa: 1013.0,
                wind_speed_ms: 3.0,
                condition: "Clear".into(),
                description: "clear sky".into(),
            }),
            stale: false,
        });
        assert!(snapshot.weather.is_some());
        assert!(snapshot.carbon.is_none());
    }
}
