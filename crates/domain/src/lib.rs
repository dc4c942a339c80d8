//! Domain types shared across the ingestion, enrichment, and retention
//! services: the hub's raw event shape, the normalized and enriched forms
//! derived from it, provider readings, and the time-series wire schema.

pub mod enriched_event;
pub mod normalized_event;
pub mod provider;
pub mod raw_event;
pub mod retention;
pub mod timeseries;

pub use enriched_event::EnrichedEvent;
pub use normalized_event::{EntityCategory, NormalizedEvent, NormalizedState};
pub use provider::{
    AirQualityFields, CalendarFields, CarbonFields, PricePoint, PricingFields, ProviderFields,
    ProviderKind, ProviderReading, ProviderSnapshot, SmartMeterFields, WeatherFields,
};
pub use raw_event::{Context, RawEvent, RawEventData, StateRecord};
pub use retention::{AggregationFn, RetentionTier, Tier};
pub use timeseries::{FieldValue, TagKey, TimeSeriesPoint, WriteBatch};
