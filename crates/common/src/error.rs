//! Error taxonomy shared across the ingestion, enrichment, provider, and
//! retention crates.
//!
//! The variants mirror the error kinds from the error-handling design:
//! transient network failures, protocol violations, authentication
//! failures, validation failures, saturation, store failures, and fatal
//! misconfiguration. Each variant carries enough context to log without a
//! caller having to downcast.

use thiserror::Error;

/// Top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Connect refused, TLS handshake failure, read timeout. Retry with backoff.
    #[error("transient network error: {0}")]
    Transient(String),

    /// Malformed frame, unexpected message, subscription timeout.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// auth_invalid from the hub, or 401/403 from a provider.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Missing or malformed event fields.
    #[error("validation error: {0}")]
    Validation(String),

    /// Intake queue high-water mark, dispatch channel full.
    #[error("saturation: {0}")]
    Saturation(String),

    /// TimeSeriesStore write failure or batch rejection.
    #[error("store error: {0}")]
    Store(String),

    /// Misconfiguration discovered at startup. The process should exit
    /// non-zero rather than start partially.
    #[error("fatal configuration error: {0}")]
    Fatal(String),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for errors that don't need their own variant.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// True for the error kinds the error-handling design says are retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Store(_))
    }
}

/// Result alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_not_retryable() {
        let err = Error::Validation("missing_field".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "validation error: missing_field");
    }

    #[test]
    fn transient_and_store_errors_are_retryable() {
        assert!(Error::Transient("connect refused".into()).is_retryable());
        assert!(Error::Store("write timeout".into()).is_retryable());
        assert!(!Error::Fatal("missing token".into()).is_retryable());
    }
}
