//! WebSocket server for live log viewers
//!
//! Every accepted connection becomes one hub subscriber and receives each
//! structured record as a text frame. Viewers never send anything meaningful;
//! incoming frames are only watched for close.
//!
//! ```text
//! LogEngine ──publish──► BroadcastHub ──queue──► client task ──ws:3000──► Browser
//! ```

use crate::error::{LogError, Result};
use crate::logging::LogEngine;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Poll interval for the shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Bound WebSocket listener, not yet serving
pub struct LiveServer {
    listener: TcpListener,
}

impl LiveServer {
    /// Bind on all interfaces; port 0 picks a free port
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| LogError::WebSocketBind { port, source: e })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Accept viewers until `shutdown` is set
    pub async fn serve(self, engine: Arc<LogEngine>, shutdown: Arc<AtomicBool>) {
        if let Some(addr) = self.local_addr() {
            info!("Live log server listening on ws://{}", addr);
        }

        while !shutdown.load(Ordering::Relaxed) {
            match tokio::time::timeout(SHUTDOWN_POLL, self.listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let engine = Arc::clone(&engine);
                    let shutdown = Arc::clone(&shutdown);
                    tokio::spawn(async move {
                        if let Err(e) = handle_viewer(stream, addr, engine, shutdown).await {
                            debug!("Viewer {} error: {}", addr, e);
                        }
                    });
                }
                Ok(Err(e)) => {
                    warn!("Failed to accept viewer connection: {}", e);
                }
                Err(_) => {} // Timeout, check shutdown flag
            }
        }
    }
}

/// Stream payloads to one viewer until either side goes away
async fn handle_viewer(
    stream: TcpStream,
    addr: SocketAddr,
    engine: Arc<LogEngine>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| LogError::WebSocketAccept {
            source: Box::new(e),
        })?;

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let mut subscription = engine.subscribe();
    let id = subscription.id();
    info!("Viewer {} connected as subscriber {}", addr, id);

    loop {
        tokio::select! {
            payload = subscription.recv() => match payload {
                Some(payload) => {
                    if ws_sink.send(Message::text(payload.to_string())).await.is_err() {
                        break;
                    }
                }
                // Dropped by the hub (lagging) or engine closed
                None => break,
            },
            incoming = ws_stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = tokio::time::sleep(SHUTDOWN_POLL) => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
    }

    engine.unsubscribe(id);
    let _ = ws_sink.close().await;
    info!("Viewer {} disconnected", addr);
    Ok(())
}
