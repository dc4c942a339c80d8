//! Bounded intake queue and HTTP dispatch workers. When the queue is at
//! capacity, the oldest unsent event is dropped to make room for the new
//! one.
//!
//! `tokio::sync::mpsc` applies backpressure on a full channel rather than
//! dropping; the drop-oldest policy needs an explicit ring buffer, so this
//! is a small `VecDeque`-backed queue instead of a bare channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use telemetry_common::Backoff;
use telemetry_config::IngestionConfig;
use telemetry_domain::RawEvent;
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{error, warn};

pub struct DispatchQueue {
    items: Mutex<VecDeque<RawEvent>>,
    capacity: usize,
    notify: Notify,
    pub dropped_events: AtomicU64,
}

impl DispatchQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
            dropped_events: AtomicU64::new(0),
        })
    }

    /// Push an event, dropping the oldest queued event if at capacity.
    pub async fn push(&self, event: RawEvent) {
        let mut items = self.items.lock().await;
        if items.len() >= self.capacity {
            items.pop_front();
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            crate::metrics::DROPPED_EVENTS.inc();
            warn!("dispatch queue full, dropped oldest event");
        }
        items.push_back(event);
        drop(items);
        self.notify.notify_one();
    }

    async fn pop(&self) -> RawEvent {
        loop {
            {
                let mut items = self.items.lock().await;
                if let Some(event) = items.pop_front() {
                    return event;
                }
            }
            self.notify.notified().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }
}

/// Spawn `config.dispatch_workers` workers draining `queue` and POSTing
/// each event to the enrichment service's intake endpoint.
pub async fn run_workers(
    queue: Arc<DispatchQueue>,
    config: Arc<IngestionConfig>,
    dispatch_failed_events: Arc<AtomicU64>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let client = reqwest::Client::new();
    let mut workers = Vec::new();

    for worker_id in 0..config.dispatch_workers {
        let queue = queue.clone();
        let client = client.clone();
        let config = config.clone();
        let dispatch_failed_events = dispatch_failed_events.clone();
        let mut shutdown_rx = shutdown_rx.resubscribe();

        workers.push(tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    event = queue.pop() => event,
                    _ = shutdown_rx.recv() => {
                        tracing::info!(worker_id, "dispatch worker shutting down");
                        return;
                    }
                };

                dispatch_one(&client, &config, &event, dispatch_failed_events.as_ref()).await;
            }
        }));
    }

    let _ = shutdown_rx.recv().await;
    for worker in workers {
        let _ = worker.await;
    }
}

async fn dispatch_one(
    client: &reqwest::Client,
    config: &IngestionConfig,
    event: &RawEvent,
    dispatch_failed_events: &AtomicU64,
) {
    let backoff = Backoff::reconnect();
    let url = format!("{}/events", config.enrichment_url.trim_end_matches('/'));

    for attempt in 0..=config.dispatch_retries {
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.post(&url).json(event).send(),
        )
        .await;

        match result {
            Ok(Ok(response)) if response.status().is_success() || response.status().as_u16() == 202 => {
                return;
            }
            Ok(Ok(response)) if response.status().as_u16() == 503 => {
                warn!(attempt, "enrichment service saturated, will retry");
            }
            Ok(Ok(response)) => {
                error!(status = %response.status(), "enrichment service rejected event, not retrying");
                dispatch_failed_events.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Ok(Err(err)) => {
                warn!(attempt, error = %err, "dispatch request failed");
            }
            Err(_) => {
                warn!(attempt, "dispatch request timed out");
            }
        }

        if attempt < config.dispatch_retries {
            tokio::time::sleep(backoff.delay(attempt)).await;
        }
    }

    error!("dispatch retries exhausted, counting dispatch_failed_events");
    dispatch_failed_events.fetch_add(1, Ordering::Relaxed);
    crate::metrics::DISPATCH_FAILED_EVENTS.inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use telemetry_domain::{Context, RawEventData};

    fn sample_event(id: &str) -> RawEvent {
        RawEvent {
            event_type: "state_changed".to_string(),
            data: RawEventData::default(),
            time_fired: Utc::now(),
            origin: "LOCAL".to_string(),
            context: Context {
                id: id.to_string(),
                parent_id: None,
                user_id: None,
            },
        }
    }

    #[tokio::test]
    async fn push_past_capacity_drops_oldest() {
        let queue = DispatchQueue::new(2);
        queue.push(sample_event("a")).await;
        queue.push(sample_event("b")).await;
        queue.push(sample_event("c")).await;

        assert_eq!(queue.dropped_events.load(Ordering::Relaxed), 1);
        assert_eq!(queue.len().await, 2);

        let first = queue.pop().await;
        assert_eq!(first.context.id, "b");
    }
}
