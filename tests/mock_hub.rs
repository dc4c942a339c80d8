/*!
 * Mock Home Assistant WebSocket hub
 *
 * Simulates the hub's auth handshake, `subscribe_events` acknowledgement,
 * and `state_changed` event push, for end-to-end tests of the ingestion
 * client's connect/auth/subscribe state machine and failover.
 */

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message};
use tracing::{debug, error, info};

/// Whether the mock hub should accept or reject the next connection's auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthBehavior {
    Accept,
    RejectWithAuthInvalid,
}

pub struct MockHubServer {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    auth_behavior: Arc<Mutex<AuthBehavior>>,
    connect_count: Arc<std::sync::atomic::AtomicU32>,
}

impl MockHubServer {
    pub async fn start(auth_behavior: AuthBehavior) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let auth_behavior = Arc::new(Mutex::new(auth_behavior));
        let connect_count = Arc::new(std::sync::atomic::AtomicU32::new(0));

        info!(%addr, "mock hub starting");

        let shutdown_rx = shutdown_tx.subscribe();
        let auth_behavior_clone = auth_behavior.clone();
        let connect_count_clone = connect_count.clone();
        tokio::spawn(async move {
            if let Err(err) = Self::run_server(listener, shutdown_rx, auth_behavior_clone, connect_count_clone).await {
                error!(%err, "mock hub server error");
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Ok(Self {
            addr,
            shutdown_tx,
            auth_behavior,
            connect_count,
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Switch what the next accepted connection's auth handshake returns —
    /// used by the failover test to flip the primary endpoint back to
    /// healthy once the fallback has taken over.
    pub async fn set_auth_behavior(&self, behavior: AuthBehavior) {
        *self.auth_behavior.lock().await = behavior;
    }

    async fn run_server(
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
        auth_behavior: Arc<Mutex<AuthBehavior>>,
        connect_count: Arc<std::sync::atomic::AtomicU32>,
    ) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!(%peer, "mock hub accepted connection");
                            connect_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                            let behavior = *auth_behavior.lock().await;
                            tokio::spawn(async move {
                                if let Err(err) = Self::handle_connection(stream, behavior).await {
                                    error!(%err, "mock hub connection error");
                                }
                            });
                        }
                        Err(err) => error!(%err, "mock hub accept failed"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("mock hub shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_connection(stream: TcpStream, behavior: AuthBehavior) -> anyhow::Result<()> {
        let ws_stream = accept_async(stream).await?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(json!({"type": "auth_required"}).to_string()))
            .await?;

        while let Some(msg) = read.next().await {
            let msg = msg?;
            let Message::Text(text) = msg else { continue };
            let request: Value = serde_json::from_str(&text)?;

            match request.get("type").and_then(Value::as_str) {
                Some("auth") => match behavior {
                    AuthBehavior::Accept => {
                        write.send(Message::Text(json!({"type": "auth_ok"}).to_string())).await?;
                    }
                    AuthBehavior::RejectWithAuthInvalid => {
                        write
                            .send(Message::Text(
                                json!({"type": "auth_invalid", "message": "invalid access token"}).to_string(),
                            ))
                            .await?;
                        return Ok(());
                    }
                },
                Some("subscribe_events") => {
                    let id = request.get("id").and_then(Value::as_u64).unwrap_or(1);
                    write
                        .send(Message::Text(json!({"type": "result", "id": id, "success": true}).to_string()))
                        .await?;

                    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    write.send(Message::Text(sample_state_changed_event())).await?;
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// The happy-path event body: `light.kitchen` turning
/// on after 245 seconds off.
pub fn sample_state_changed_event() -> String {
    json!({
        "type": "event",
        "event": {
            "event_type": "state_changed",
            "time_fired": "2025-01-02T03:04:05.000Z",
            "context": {"id": "ctx-1"},
            "data": {
                "entity_id": "light.kitchen",
                "old_state": {
                    "state": "off",
                    "last_changed": "2025-01-02T03:00:00Z",
                    "attributes": {}
                },
                "new_state": {
                    "state": "on",
                    "last_changed": "2025-01-02T03:04:05Z",
                    "attributes": {"device_class": "light", "friendly_name": "Kitchen"}
                }
            }
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_hub_starts_and_reports_its_url() {
        let hub = MockHubServer::start(AuthBehavior::Accept).await.unwrap();
        assert!(hub.url().starts_with("ws://127.0.0.1:"));
        hub.shutdown();
    }
}
