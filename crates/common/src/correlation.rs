//! Correlation ids.
//!
//! A `CorrelationId` is the opaque string shared by every log record caused
//! by a single event. It is propagated from the hub's `context.id` when
//! present and minted fresh otherwise.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque id shared by all log/metric emissions caused by one event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Mint a fresh correlation id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an inbound id (e.g. the hub event's `context.id`), falling back
    /// to a freshly minted id if it is empty.
    pub fn from_inbound(id: Option<&str>) -> Self {
        match id {
            Some(id) if !id.trim().is_empty() => Self(id.to_string()),
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_inbound_id() {
        let id = CorrelationId::from_inbound(Some("ctx-1"));
        assert_eq!(id.as_str(), "ctx-1");
    }

    #[test]
    fn mints_fresh_id_when_absent() {
        let a = CorrelationId::from_inbound(None);
        let b = CorrelationId::from_inbound(Some("  "));
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }
}
