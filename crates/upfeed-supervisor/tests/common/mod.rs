//! Shared fixtures: a mock feed server plus static authorizer and
//! credential implementations.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use upfeed_core::{Credential, CredentialError, CredentialProvider};
use upfeed_ws::{FeedAuthorizer, WsResult};

/// Poll `condition` every 20ms until it holds or the deadline passes.
pub async fn eventually<F, Fut>(deadline: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition().await
}

/// Mock feed server. Accepts WebSocket connections, records every control
/// frame it receives (the real server takes JSON in binary frames) and can
/// kill all live connections to simulate a server-side drop.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    kill_tx: broadcast::Sender<()>,
    frames: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicU32>,
}

impl MockFeedServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let frames: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicU32::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (kill_tx, _) = broadcast::channel::<()>(4);

        let frames_clone = frames.clone();
        let connections_clone = connections.clone();
        let kill_tx_clone = kill_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let frames = frames_clone.clone();
                        let connections = connections_clone.clone();
                        let kill_rx = kill_tx_clone.subscribe();
                        tokio::spawn(handle_connection(stream, frames, connections, kill_rx));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            kill_tx,
            frames,
            connections,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Control frames received so far, in arrival order, as JSON text.
    pub async fn received_frames(&self) -> Vec<String> {
        self.frames.lock().await.clone()
    }

    /// Close every live connection, as a server-side drop would.
    pub fn drop_connections(&self) {
        let _ = self.kill_tx.send(());
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    frames: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicU32>,
    mut kill_rx: broadcast::Receiver<()>,
) {
    connections.fetch_add(1, Ordering::SeqCst);

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = kill_rx.recv() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        if let Ok(text) = String::from_utf8(data) {
                            frames.lock().await.push(text);
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        frames.lock().await.push(text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }
}

/// Authorizer that always hands out the same URL and counts calls, standing
/// in for the broker's single-use URL endpoint.
pub struct StaticAuthorizer {
    url: String,
    calls: AtomicU32,
}

impl StaticAuthorizer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedAuthorizer for StaticAuthorizer {
    async fn authorize(&self, _access_token: &str) -> WsResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.url.clone())
    }
}

/// Credential provider backed by a fixed token.
pub struct FixedCredentials {
    credential: Credential,
}

impl FixedCredentials {
    pub fn valid() -> Self {
        Self {
            credential: Credential::new("test-token", Utc::now() + ChronoDuration::hours(1)),
        }
    }

    pub fn expired() -> Self {
        Self {
            credential: Credential::new("test-token", Utc::now() - ChronoDuration::hours(1)),
        }
    }
}

impl CredentialProvider for FixedCredentials {
    fn credential(&self) -> Result<Credential, CredentialError> {
        Ok(self.credential.clone())
    }
}

/// Provider with no credential configured at all.
pub struct MissingCredentials;

impl CredentialProvider for MissingCredentials {
    fn credential(&self) -> Result<Credential, CredentialError> {
        Err(CredentialError::NotConfigured)
    }
}
