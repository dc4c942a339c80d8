//! Job scheduling: each job runs its own `tokio::time::interval` loop,
//! guarded by a per-job `AtomicBool` "singleton flag" so overlapping ticks
//! are skipped rather than queued. Failed runs retry with exponential
//! backoff up to 5 attempts.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use telemetry_common::Backoff;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

const MAX_JOB_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, serde::Serialize)]
pub struct JobStatus {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_success: Option<bool>,
    pub consecutive_failures: u32,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            last_run_at: None,
            last_success: None,
            consecutive_failures: 0,
        }
    }
}

pub type JobRegistry = Arc<DashMap<&'static str, JobStatus>>;

pub fn new_registry() -> JobRegistry {
    Arc::new(DashMap::new())
}

/// Run `job` every `interval`, skipping a tick if the previous run of the
/// same job is still in flight.
pub async fn run_job<F, Fut>(
    name: &'static str,
    interval: Duration,
    registry: JobRegistry,
    mut job: F,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    let running = Arc::new(AtomicBool::new(false));
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if running.swap(true, Ordering::SeqCst) {
                    warn!(job = name, "previous run still in progress, skipping this tick");
                    continue;
                }

                let result = run_with_retries(name, &mut job).await;
                running.store(false, Ordering::SeqCst);

                let mut status = registry.entry(name).or_default();
                status.last_run_at = Some(Utc::now());
                match result {
                    Ok(()) => {
                        status.last_success = Some(true);
                        status.consecutive_failures = 0;
                        info!(job = name, "job run succeeded");
                    }
                    Err(err) => {
                        status.last_success = Some(false);
                        status.consecutive_failures += 1;
                        error!(job = name, error = %err, "job run exhausted retries");
                    }
                }
            }
            _ = shutdown_rx.recv() => return,
        }
    }
}

async fn run_with_retries<F, Fut>(name: &'static str, job: &mut F) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let backoff = Backoff::reconnect();
    let mut last_err = None;

    for attempt in 0..MAX_JOB_ATTEMPTS {
        match job().await {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(job = name, attempt, error = %err, "job attempt failed");
                last_err = Some(err);
                if attempt + 1 < MAX_JOB_ATTEMPTS {
                    tokio::time::sleep(backoff.delay(attempt)).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("job failed with no recorded error")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn retries_exhaust_and_report_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result = run_with_retries("test-job", &mut || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::Relaxed);
                anyhow::bail!("upstream down")
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::Relaxed), MAX_JOB_ATTEMPTS);
    }

    #[tokio::test]
    async fn succeeds_without_exhausting_retries() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result = run_with_retries("test-job", &mut || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }
}
