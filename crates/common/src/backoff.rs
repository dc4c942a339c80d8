//! Exponential backoff with jitter, shared by the ingestion client's
//! reconnect loop, its HTTP dispatch retries, and the retention engine's
//! per-job retries.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff schedule: `min(base * factor^attempt, cap)`, jittered
/// by `jitter_fraction` in either direction.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base: Duration,
    pub factor: f64,
    pub cap: Duration,
    pub jitter_fraction: f64,
}

impl Backoff {
    /// The IngestionClient's reconnect schedule: base 1s, factor 2, cap 60s,
    /// ±20% jitter.
    pub fn reconnect() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2.0,
            cap: Duration::from_secs(60),
            jitter_fraction: 0.2,
        }
    }

    /// Delay to wait before the given (0-indexed) attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential = self.base.as_secs_f64() * self.factor.powi(attempt as i32);
        let capped = exponential.min(self.cap.as_secs_f64());

        let mut rng = rand::thread_rng();
        let jitter = rng.gen_range((1.0 - self.jitter_fraction)..(1.0 + self.jitter_fraction));
        Duration::from_secs_f64((capped * jitter).max(0.0))
    }
}

/// Classify an HTTP status code as retryable, following the error
/// handling design's transient/permanent split.
pub fn is_retryable_status(status: Option<u16>) -> bool {
    match status {
        None => true,
        Some(code) if (200..300).contains(&code) => false,
        Some(429) => true,
        Some(code) if (400..500).contains(&code) => false,
        Some(code) if (500..600).contains(&code) => true,
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let b = Backoff {
            base: Duration::from_secs(1),
            factor: 2.0,
            cap: Duration::from_secs(60),
            jitter_fraction: 0.0,
        };
        assert_eq!(b.delay(0), Duration::from_secs(1));
        assert_eq!(b.delay(1), Duration::from_secs(2));
        assert_eq!(b.delay(2), Duration::from_secs(4));
        assert_eq!(b.delay(10), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let b = Backoff::reconnect();
        for attempt in 0..5 {
            let d = b.delay(attempt).as_secs_f64();
            let expected = (b.base.as_secs_f64() * 2f64.powi(attempt as i32)).min(60.0);
            assert!(d >= expected * 0.8 - 0.001);
            assert!(d <= expected * 1.2 + 0.001);
        }
    }

    #[test]
    fn retryable_status_classification() {
        assert!(is_retryable_status(None));
        assert!(!is_retryable_status(Some(200)));
        assert!(!is_retryable_status(Some(400)));
        assert!(!is_retryable_status(Some(404)));
        assert!(is_retryable_status(Some(429)));
        assert!(is_retryable_status(Some(500)));
        assert!(is_retryable_status(Some(503)));
    }
}
