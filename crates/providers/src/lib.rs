pub mod air_quality;
pub mod calendar;
pub mod carbon;
pub mod framework;
pub mod health_server;
pub mod pricing;
pub mod smart_meter;
pub mod weather;

pub use framework::{PollingProvider, ProviderHealth};

/// The single location/key this deployment polls providers for; a
/// single-home deployment has exactly one.
pub const HOME_KEY: &str = "home";
