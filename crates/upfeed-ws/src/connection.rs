//! WebSocket connection manager.
//!
//! Owns one feed session at a time and drives the full lifecycle:
//! authorize -> connect -> resubscribe -> receive loop -> close, with
//! capped exponential backoff on unexpected closes and a staleness
//! heartbeat that force-closes silently dead sockets.

use crate::authorize::FeedAuthorizer;
use crate::error::{WsError, WsResult};
use crate::heartbeat::{StalenessMonitor, StalenessVerdict};
use crate::message::{ConnectionEvent, ControlFrame, FeedMessage};
use crate::subscription::SubscriptionRegistry;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use upfeed_core::{ConnectionStats, FeedMode, InstrumentKey};
use upfeed_proto::decode_frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed authorization endpoint (returns a single-use WebSocket URL).
    pub authorize_url: String,
    /// Attempts before reconnection is abandoned as a terminal error.
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay: Duration,
    /// Backoff ceiling.
    pub reconnect_max_delay: Duration,
    /// Staleness heartbeat interval.
    pub heartbeat_interval: Duration,
    /// Pause after socket open before resubscribing, so the server finishes
    /// session setup first.
    pub resubscribe_settle_delay: Duration,
    /// Timeout for the authorize HTTP call.
    pub authorize_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            authorize_url: String::new(),
            max_reconnect_attempts: 10,
            reconnect_base_delay: Duration::from_secs(5),
            reconnect_max_delay: Duration::from_secs(120),
            heartbeat_interval: Duration::from_secs(30),
            resubscribe_settle_delay: Duration::from_secs(2),
            authorize_timeout: Duration::from_secs(30),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Authenticating,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// How one session ended.
enum SessionEnd {
    /// Intentional close via the cancellation token.
    Shutdown,
    /// Server closed the socket or the stream ended.
    Remote { code: u16, reason: String },
}

/// WebSocket connection manager for the market data feed.
pub struct ConnectionManager {
    config: FeedConfig,
    access_token: String,
    authorizer: Arc<dyn FeedAuthorizer>,
    state: Arc<RwLock<ConnectionState>>,
    registry: Arc<SubscriptionRegistry>,
    staleness: Arc<StalenessMonitor>,
    reconnect_attempts: Arc<RwLock<u32>>,
    feed_tx: mpsc::Sender<FeedMessage>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    outbound_tx: mpsc::Sender<ControlFrame>,
    outbound_rx: TokioMutex<mpsc::Receiver<ControlFrame>>,
    shutdown: CancellationToken,
}

impl ConnectionManager {
    pub fn new(
        config: FeedConfig,
        access_token: impl Into<String>,
        authorizer: Arc<dyn FeedAuthorizer>,
        feed_tx: mpsc::Sender<FeedMessage>,
        event_tx: mpsc::Sender<ConnectionEvent>,
    ) -> Self {
        let staleness = StalenessMonitor::new(config.heartbeat_interval);
        let (outbound_tx, outbound_rx) = mpsc::channel(100);
        Self {
            config,
            access_token: access_token.into(),
            authorizer,
            state: Arc::new(RwLock::new(ConnectionState::Idle)),
            registry: Arc::new(SubscriptionRegistry::new()),
            staleness: Arc::new(staleness),
            reconnect_attempts: Arc::new(RwLock::new(0)),
            feed_tx,
            event_tx,
            outbound_tx,
            outbound_rx: TokioMutex::new(outbound_rx),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Snapshot published to the status store by the supervisor.
    pub fn connection_stats(&self) -> ConnectionStats {
        ConnectionStats {
            connected: self.is_connected(),
            reconnect_attempts: *self.reconnect_attempts.read(),
            subscriptions_count: self.registry.len(),
            last_message_time: self.staleness.last_message_time(),
            seconds_since_last_message: self.staleness.seconds_since_last_message(),
        }
    }

    /// Subscribe to instruments. The registry is updated synchronously; the
    /// control frame is best-effort and silently skipped when no socket is
    /// open (the post-connect resubscription will cover it).
    ///
    /// Re-subscribing an existing key still sends a frame, which is how mode
    /// upgrades reach the server.
    pub async fn subscribe(&self, keys: &[InstrumentKey], mode: FeedMode) {
        self.registry.add(keys, mode);
        self.send_control(ControlFrame::subscribe(keys, mode)).await;
    }

    /// Unsubscribe from instruments; keys not present are ignored.
    pub async fn unsubscribe(&self, keys: &[InstrumentKey]) {
        self.registry.remove(keys);
        self.send_control(ControlFrame::unsubscribe(keys)).await;
    }

    /// Switch the feed mode for the given instruments.
    pub async fn change_mode(&self, keys: &[InstrumentKey], mode: FeedMode) {
        self.registry.set_mode(mode);
        self.send_control(ControlFrame::change_mode(keys, mode)).await;
    }

    async fn send_control(&self, frame: ControlFrame) {
        if !self.is_connected() {
            debug!(method = ?frame.method(), "no open socket, control frame skipped");
            return;
        }
        if self.outbound_tx.send(frame).await.is_err() {
            warn!("outbound channel closed, control frame dropped");
        }
    }

    /// Intentional close. Idempotent; the running session observes the
    /// cancellation at its next suspension point, sends a Close frame and
    /// settles into `Closed` without reconnecting.
    pub fn disconnect(&self) {
        if !self.shutdown.is_cancelled() {
            info!("intentional disconnect requested");
        }
        self.shutdown.cancel();
        self.registry.clear();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Drive the connect/receive/reconnect loop until an intentional
    /// disconnect or a terminal error. One call per manager instance.
    pub async fn run(&self) -> WsResult<()> {
        let result = self.run_inner().await;
        *self.state.write() = ConnectionState::Closed;
        result
    }

    async fn run_inner(&self) -> WsResult<()> {
        loop {
            if self.shutdown.is_cancelled() {
                info!("shutdown requested, exiting connect loop");
                return Ok(());
            }

            match self.try_session().await {
                Ok(SessionEnd::Shutdown) => return Ok(()),
                Ok(SessionEnd::Remote { code, reason }) => {
                    warn!(code, %reason, "feed socket closed by server");
                }
                Err(WsError::Auth(message)) => {
                    error!(%message, "feed authorization rejected, not retrying");
                    self.emit_error(format!("feed authorization rejected: {message}"), true)
                        .await;
                    return Err(WsError::Auth(message));
                }
                Err(WsError::Http(message)) => {
                    warn!(%message, "authorize endpoint unreachable");
                    self.emit_error(message, false).await;
                }
                Err(e) => {
                    warn!(error = %e, "feed session error");
                }
            }

            if self.shutdown.is_cancelled() {
                info!("shutdown requested after disconnect, not reconnecting");
                return Ok(());
            }

            let attempt = {
                let mut attempts = self.reconnect_attempts.write();
                *attempts += 1;
                *attempts
            };

            if attempt > self.config.max_reconnect_attempts {
                let max = self.config.max_reconnect_attempts;
                error!(max, "max reconnection attempts reached, giving up");
                self.emit_error(
                    format!("Max reconnection attempts ({max}) reached"),
                    true,
                )
                .await;
                return Err(WsError::MaxReconnectsExceeded(max));
            }

            *self.state.write() = ConnectionState::Connecting;
            let delay = backoff_delay(
                self.config.reconnect_base_delay,
                self.config.reconnect_max_delay,
                attempt,
            );
            warn!(
                attempt,
                max = self.config.max_reconnect_attempts,
                delay_ms = delay.as_millis(),
                "scheduling reconnection"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.cancelled() => {
                    info!("shutdown requested during backoff, exiting");
                    return Ok(());
                }
            }
        }
    }

    /// One full session: authorize, connect, resubscribe, receive.
    async fn try_session(&self) -> WsResult<SessionEnd> {
        *self.state.write() = ConnectionState::Authenticating;
        // Feed URLs are single-use; a fresh one is required on every attempt.
        let ws_url = self.authorizer.authorize(&self.access_token).await?;

        *self.state.write() = ConnectionState::Connecting;
        info!("connecting to feed socket");
        let (ws_stream, _response) =
            connect_async_tls_with_config(&ws_url, None, true, None).await?;
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ConnectionState::Open;
        *self.reconnect_attempts.write() = 0;
        self.staleness.reset();
        self.emit_event(ConnectionEvent::Connected).await;
        info!("feed socket open");

        let outcome = self.session_loop(&mut write, &mut read).await;

        match outcome {
            Ok(SessionEnd::Shutdown) => {
                self.emit_event(ConnectionEvent::Disconnected {
                    code: 1000,
                    reason: "client disconnect".to_string(),
                })
                .await;
                Ok(SessionEnd::Shutdown)
            }
            Ok(SessionEnd::Remote { code, reason }) => {
                self.emit_event(ConnectionEvent::Disconnected {
                    code,
                    reason: reason.clone(),
                })
                .await;
                Ok(SessionEnd::Remote { code, reason })
            }
            Err(e) => {
                self.emit_event(ConnectionEvent::Disconnected {
                    code: 1006,
                    reason: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn session_loop(
        &self,
        write: &mut WsSink,
        read: &mut WsSource,
    ) -> WsResult<SessionEnd> {
        // Let the server finish session setup before replaying subscriptions.
        // The snapshot is taken after the settle delay so it reflects the
        // live registry, not the state at open.
        if !self.registry.is_empty() {
            tokio::select! {
                () = tokio::time::sleep(self.config.resubscribe_settle_delay) => {
                    let snapshot = self.registry.snapshot();
                    if !snapshot.keys.is_empty() {
                        let frame = ControlFrame::subscribe(&snapshot.keys, snapshot.mode);
                        write.send(Message::Binary(frame.to_binary()?)).await?;
                        info!(
                            count = snapshot.keys.len(),
                            mode = %snapshot.mode,
                            "subscriptions replayed after connect"
                        );
                    }
                }
                () = self.shutdown.cancelled() => {}
            }
        }

        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        let mut outbound = self.outbound_rx.lock().await;

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("shutdown signal received in session loop");
                    *self.state.write() = ConnectionState::Closing;
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "failed to send close frame during shutdown");
                    }
                    return Ok(SessionEnd::Shutdown);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Binary(data))) => {
                            self.handle_binary_frame(&data).await;
                        }
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_frame(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("ping received, answering pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "normal close".to_string()));
                            return Ok(SessionEnd::Remote { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "feed socket read error");
                            return Err(e.into());
                        }
                        None => {
                            return Ok(SessionEnd::Remote {
                                code: 1006,
                                reason: "stream ended".to_string(),
                            });
                        }
                        _ => {}
                    }
                }

                frame = outbound.recv() => {
                    if let Some(frame) = frame {
                        match frame.to_binary() {
                            Ok(bytes) => write.send(Message::Binary(bytes)).await?,
                            Err(e) => warn!(error = %e, "control frame serialization failed"),
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    match self.staleness.check() {
                        StalenessVerdict::Fresh => {}
                        StalenessVerdict::Stale { silent_for_secs } => {
                            warn!(silent_for_secs, "no feed data recently, connection may be stale");
                        }
                        StalenessVerdict::Dead { silent_for_secs } => {
                            error!(silent_for_secs, "connection appears dead, forcing close");
                            let _ = write.send(Message::Close(None)).await;
                            return Err(WsError::StaleConnection { silent_for_secs });
                        }
                    }
                }
            }
        }
    }

    /// Decode one binary frame. Decode failures degrade per-frame and never
    /// close the connection: protobuf first, then JSON, then raw bytes.
    async fn handle_binary_frame(&self, data: &[u8]) {
        self.staleness.record_message();

        let message = match decode_frame(data) {
            Ok(envelope) => FeedMessage::Feed(envelope),
            Err(e) => {
                warn!(error = %e, len = data.len(), "feed frame decode failed, degrading");
                match serde_json::from_slice::<serde_json::Value>(data) {
                    Ok(value) => FeedMessage::Json(value),
                    Err(_) => FeedMessage::Raw(data.to_vec()),
                }
            }
        };

        self.forward(message).await;
    }

    async fn handle_text_frame(&self, text: &str) {
        self.staleness.record_message();

        let message = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => FeedMessage::Json(value),
            Err(_) => FeedMessage::Raw(text.as_bytes().to_vec()),
        };

        self.forward(message).await;
    }

    async fn forward(&self, message: FeedMessage) {
        if self.feed_tx.send(message).await.is_err() {
            warn!("feed receiver dropped");
        }
    }

    async fn emit_event(&self, event: ConnectionEvent) {
        if self.event_tx.send(event).await.is_err() {
            warn!("event receiver dropped");
        }
    }

    async fn emit_error(&self, message: String, fatal: bool) {
        self.emit_event(ConnectionEvent::Error { message, fatal }).await;
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped.
fn backoff_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    base.saturating_mul(1u32 << exponent).min(cap)
}
