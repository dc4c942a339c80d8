//! BatchWriter: buffers points by size-or-timeout, flushes whole-batch
//! with retry, and dead-letters on exhaustion.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use telemetry_common::{BatchBuffer, Backoff};
use telemetry_domain::{TimeSeriesPoint, WriteBatch};
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::store::StoreClient;

const MAX_FLUSH_ATTEMPTS: u32 = 5;

pub struct BatchWriter {
    store: Arc<StoreClient>,
    dead_letter_path: PathBuf,
    pub batches_flushed: AtomicU64,
    pub batches_dead_lettered: AtomicU64,
}

impl BatchWriter {
    pub fn new(store: Arc<StoreClient>, dead_letter_path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            store,
            dead_letter_path: dead_letter_path.into(),
            batches_flushed: AtomicU64::new(0),
            batches_dead_lettered: AtomicU64::new(0),
        })
    }

    /// Run the size-or-timeout buffering loop, pulling points from `points_rx`
    /// until `shutdown_rx` fires, then flush whatever remains within
    /// `flush_timeout`.
    pub async fn run(
        self: Arc<Self>,
        mut points_rx: mpsc::Receiver<TimeSeriesPoint>,
        batch_size: usize,
        batch_timeout: Duration,
        flush_timeout: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut buffer = BatchBuffer::new(batch_size);
        let mut ticker = tokio::time::interval(batch_timeout);
        ticker.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                maybe_point = points_rx.recv() => {
                    match maybe_point {
                        Some(point) => {
                            if buffer.push(point) {
                                self.flush(buffer.drain(), flush_timeout).await;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        self.flush(buffer.drain(), flush_timeout).await;
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("batch writer received shutdown signal, draining remaining points");
                    break;
                }
            }
        }

        while let Ok(point) = points_rx.try_recv() {
            if buffer.push(point) {
                self.flush(buffer.drain(), flush_timeout).await;
            }
        }
        if !buffer.is_empty() {
            self.flush(buffer.drain(), flush_timeout).await;
        }
    }

    async fn flush(&self, points: Vec<TimeSeriesPoint>, flush_timeout: Duration) {
        if points.is_empty() {
            return;
        }

        let batch = WriteBatch::new(points, chrono::Utc::now());
        let backoff = Backoff::reconnect();

        for attempt in 0..MAX_FLUSH_ATTEMPTS {
            let result = tokio::time::timeout(flush_timeout, self.store.write_batch(&batch)).await;
            match result {
                Ok(Ok(())) => {
                    self.batches_flushed.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Ok(Err(err)) => {
                    warn!(batch_id = %batch.id, attempt, error = %err, "batch flush failed");
                }
                Err(_) => {
                    warn!(batch_id = %batch.id, attempt, "batch flush timed out");
                }
            }

            if attempt + 1 < MAX_FLUSH_ATTEMPTS {
                tokio::time::sleep(backoff.delay(attempt)).await;
            }
        }

        error!(batch_id = %batch.id, "batch flush retries exhausted, dead-lettering");
        self.batches_dead_lettered.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.dead_letter(&batch).await {
            error!(batch_id = %batch.id, error = %err, "failed to write batch to dead-letter log");
        }
    }

    async fn dead_letter(&self, batch: &WriteBatch) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.dead_letter_path)
            .await?;

        let line = serde_json::to_string(batch).unwrap_or_default();
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_buffer_flushes_at_capacity() {
        let mut buffer = BatchBuffer::new(2);
        let ts = chrono::Utc::now();
        assert!(!buffer.push(TimeSeriesPoint::new("m", ts)));
        assert!(buffer.push(TimeSeriesPoint::new("m", ts)));
        assert_eq!(buffer.drain().len(), 2);
    }
}
