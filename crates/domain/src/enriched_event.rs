//! `NormalizedEvent` extended with a provider snapshot.

use serde::{Deserialize, Serialize};

use crate::normalized_event::NormalizedEvent;
use crate::provider::ProviderSnapshot;

/// Exists only across the enrichment -> write span; never queried back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedEvent {
    pub event: NormalizedEvent,
    pub providers: ProviderSnapshot,
}

impl EnrichedEvent {
    pub fn new(event: NormalizedEvent, providers: ProviderSnapshot) -> Self {
        Self { event, providers }
    }
}
