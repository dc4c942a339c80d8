//! Connection state machine to the hub WebSocket.
//!
//! DISCONNECTED -> CONNECTING -> AUTHENTICATING -> SUBSCRIBING -> RUNNING,
//! with endpoint failover and a watchdog for event silence, mirroring the
//! teacher's `websocket.rs` per-chain connect/backoff loop but speaking the
//! hub's auth/subscribe handshake instead of `eth_subscribe`.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use telemetry_common::{Backoff, CorrelationId};
use telemetry_config::IngestionConfig;
use telemetry_domain::RawEvent;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{error, info, warn};

use crate::endpoint::EndpointTable;
use crate::frame::{auth_frame, parse_frame, subscribe_frame, InboundFrame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const AUTH_TIMEOUT: Duration = Duration::from_secs(10);
const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);
const SUBSCRIBE_SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Subscribing,
    Running,
}

/// Shared, lock-free health snapshot read by the `/health` HTTP surface.
pub struct SharedHealth {
    connected: AtomicBool,
    active_endpoint_is_primary: AtomicBool,
    last_event_at_unix_ms: AtomicI64,
}

impl SharedHealth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(false),
            active_endpoint_is_primary: AtomicBool::new(true),
            last_event_at_unix_ms: AtomicI64::new(chrono::Utc::now().timestamp_millis()),
        })
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn set_active_primary(&self, primary: bool) {
        self.active_endpoint_is_primary
            .store(primary, Ordering::Relaxed);
    }

    pub fn mark_event_received(&self) {
        self.last_event_at_unix_ms
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn is_active_primary(&self) -> bool {
        self.active_endpoint_is_primary.load(Ordering::Relaxed)
    }

    pub fn silence_duration(&self) -> Duration {
        let last = self.last_event_at_unix_ms.load(Ordering::Relaxed);
        let now = chrono::Utc::now().timestamp_millis();
        Duration::from_millis(now.saturating_sub(last).max(0) as u64)
    }
}

/// Runs the hub connection loop until shutdown: connects, authenticates,
/// subscribes, then forwards `event` frames to `event_tx` until the
/// connection drops, reconnecting with backoff and endpoint failover.
pub async fn run(
    config: Arc<IngestionConfig>,
    event_tx: mpsc::Sender<RawEvent>,
    health: Arc<SharedHealth>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut endpoints = EndpointTable::from_config(&config);
    let backoff = Backoff::reconnect();
    let mut attempt: u32 = 0;

    loop {
        if endpoints.should_probe_primary(config.reconnect_to_primary_interval) {
            info!("probing primary endpoint for reconnect");
            endpoints.switch_to_primary();
        }

        health.set_active_primary(endpoints.is_primary_active());
        let endpoint = endpoints.active().clone();

        info!(endpoint = %endpoint.url, "connecting to hub");

        let session = tokio::select! {
            result = connect_and_run(&endpoint.url, &endpoint.token, &event_tx, &health) => result,
            _ = shutdown_rx.recv() => {
                info!("ingestion client received shutdown signal");
                return;
            }
        };

        health.set_connected(false);

        match session {
            Ok(()) => {
                info!(endpoint = %endpoint.url, "hub session ended cleanly");
                attempt = 0;
            }
            Err(SessionError::AuthInvalid(message)) => {
                warn!(endpoint = %endpoint.url, %message, "auth_invalid from hub, rotating endpoint");
                crate::metrics::RECONNECTS
                    .with_label_values(&["auth_invalid"])
                    .inc();
                endpoints.rotate();
                attempt = 0;
            }
            Err(SessionError::Other(err)) => {
                attempt += 1;
                error!(endpoint = %endpoint.url, attempt, error = %err, "hub session failed");
                crate::metrics::RECONNECTS
                    .with_label_values(&["connection_error"])
                    .inc();
            }
        }

        let delay = backoff.delay(attempt);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.recv() => {
                info!("ingestion client received shutdown signal during backoff");
                return;
            }
        }
    }
}

enum SessionError {
    AuthInvalid(String),
    Other(anyhow::Error),
}

impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        SessionError::Other(err)
    }
}

async fn connect_and_run(
    url: &str,
    token: &str,
    event_tx: &mpsc::Sender<RawEvent>,
    health: &Arc<SharedHealth>,
) -> Result<(), SessionError> {
    let (mut stream, _) = tokio::time::timeout(Duration::from_secs(10), connect_async(url))
        .await
        .map_err(|_| anyhow::anyhow!("connect timeout"))?
        .map_err(|err| anyhow::anyhow!("connect failed: {err}"))?;

    authenticate(&mut stream, token).await?;
    subscribe(&mut stream).await?;

    health.set_connected(true);
    health.mark_event_received();
    info!("subscription restored, forwarding events downstream");

    loop {
        let msg = stream
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("hub connection closed"))?
            .map_err(|err| anyhow::anyhow!("websocket error: {err}"))?;

        let Message::Text(text) = msg else { continue };

        let frame = parse_frame(&text)
            .map_err(|err| anyhow::anyhow!("malformed frame: {err}"))?;

        match frame {
            InboundFrame::Event(raw_event) => {
                health.mark_event_received();
                let correlation = CorrelationId::from_inbound(Some(&raw_event.context.id));
                crate::metrics::EVENTS_FORWARDED
                    .with_label_values(&[url])
                    .inc();
                if event_tx.send(*raw_event).await.is_err() {
                    return Err(anyhow::anyhow!("downstream channel closed").into());
                }
                tracing::debug!(correlation_id = %correlation, "forwarded event to dispatcher");
            }
            InboundFrame::AuthInvalid { message } => {
                return Err(SessionError::AuthInvalid(message));
            }
            InboundFrame::Result { success: false, id } => {
                warn!(id, "hub returned unsuccessful result frame");
            }
            InboundFrame::Pong | InboundFrame::Result { success: true, .. } | InboundFrame::AuthOk | InboundFrame::AuthRequired | InboundFrame::Unknown => {}
        }
    }
}

async fn authenticate(stream: &mut WsStream, token: &str) -> Result<(), anyhow::Error> {
    let greeting = tokio::time::timeout(AUTH_TIMEOUT, stream.next())
        .await
        .map_err(|_| anyhow::anyhow!("timed out waiting for auth_required"))?
        .ok_or_else(|| anyhow::anyhow!("stream closed before auth_required"))?
        .map_err(|err| anyhow::anyhow!("websocket error: {err}"))?;

    if let Message::Text(text) = greeting {
        if parse_frame(&text)? != InboundFrame::AuthRequired {
            return Err(anyhow::anyhow!("expected auth_required greeting"));
        }
    }

    stream
        .send(Message::Text(auth_frame(token)))
        .await
        .map_err(|err| anyhow::anyhow!("failed to send auth frame: {err}"))?;

    let reply = tokio::time::timeout(AUTH_TIMEOUT, stream.next())
        .await
        .map_err(|_| anyhow::anyhow!("auth_ok not received within 10s"))?
        .ok_or_else(|| anyhow::anyhow!("stream closed awaiting auth_ok"))?
        .map_err(|err| anyhow::anyhow!("websocket error: {err}"))?;

    if let Message::Text(text) = reply {
        match parse_frame(&text)? {
            InboundFrame::AuthOk => Ok(()),
            InboundFrame::AuthInvalid { message } => {
                Err(anyhow::anyhow!("auth_invalid: {message}"))
            }
            _ => Err(anyhow::anyhow!("unexpected frame while authenticating")),
        }
    } else {
        Err(anyhow::anyhow!("expected text frame while authenticating"))
    }
}

async fn subscribe(stream: &mut WsStream) -> Result<(), anyhow::Error> {
    tokio::time::sleep(SUBSCRIBE_SETTLE_DELAY).await;

    let subscription_id = 1;
    stream
        .send(Message::Text(subscribe_frame(subscription_id)))
        .await
        .map_err(|err| anyhow::anyhow!("failed to send subscribe_events: {err}"))?;

    let reply = tokio::time::timeout(SUBSCRIBE_TIMEOUT, stream.next())
        .await
        .map_err(|_| anyhow::anyhow!("subscribe result not received within 10s"))?
        .ok_or_else(|| anyhow::anyhow!("stream closed awaiting subscribe result"))?
        .map_err(|err| anyhow::anyhow!("websocket error: {err}"))?;

    if let Message::Text(text) = reply {
        match parse_frame(&text)? {
            InboundFrame::Result { id, success: true } if id == subscription_id => Ok(()),
            InboundFrame::Result { success: false, .. } => {
                Err(anyhow::anyhow!("subscribe_events result reported failure"))
            }
            _ => Err(anyhow::anyhow!("unexpected frame while subscribing")),
        }
    } else {
        Err(anyhow::anyhow!("expected text frame while subscribing"))
    }
}
