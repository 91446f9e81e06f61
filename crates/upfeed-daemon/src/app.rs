//! Application wiring.
//!
//! Builds the Redis status store, the supervisor and the downstream sink,
//! and implements the CLI commands on top of the supervisor operations.

use crate::config::DaemonConfig;
use crate::credentials::EnvCredentialProvider;
use crate::error::AppResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use upfeed_status::{RedisStatusStore, StatusBoard};
use upfeed_supervisor::{
    HealthVerdict, ServiceRegistry, StartOutcome, StopOutcome, Supervisor, SupervisorConfig,
};
use upfeed_ws::{FeedMessage, HttpAuthorizer};

pub struct Application {
    supervisor: Supervisor<RedisStatusStore, EnvCredentialProvider>,
    health_check_interval: Duration,
}

impl Application {
    pub async fn build(config: &DaemonConfig) -> AppResult<Self> {
        let supervisor_config: SupervisorConfig = config.supervisor_config()?;

        let store = RedisStatusStore::connect(&config.redis_url, config.namespace.clone()).await?;
        let board = StatusBoard::new(store);

        let authorizer = Arc::new(HttpAuthorizer::new(
            config.authorize_url.clone(),
            supervisor_config.feed.authorize_timeout,
        )?);

        let (feed_tx, feed_rx) = mpsc::channel(1024);
        spawn_feed_sink(feed_rx);

        let supervisor = Supervisor::new(
            board,
            EnvCredentialProvider::new(),
            ServiceRegistry::new(),
            authorizer,
            feed_tx,
            supervisor_config,
        );

        Ok(Self {
            supervisor,
            health_check_interval: config.health_check_interval(),
        })
    }

    /// `start`: bring the service up and keep the process alive until the
    /// connection manager exits or ctrl-c triggers a graceful stop.
    pub async fn start(&self) -> AppResult<()> {
        match self.supervisor.start().await? {
            StartOutcome::Started => {}
            StartOutcome::AlreadyRunning => {
                info!("service already running, nothing to do");
                return Ok(());
            }
            StartOutcome::Failed => {
                warn!("service failed to start, see published error status");
                return Ok(());
            }
        }
        self.wait_and_stop(None).await
    }

    /// `run`: start plus periodic in-process health checks.
    pub async fn run(&self) -> AppResult<()> {
        if self.supervisor.start().await? == StartOutcome::Failed {
            warn!("service failed to start, see published error status");
            return Ok(());
        }
        self.wait_and_stop(Some(self.health_check_interval)).await
    }

    /// `stop`: out-of-process stop request against the shared store.
    pub async fn stop(&self) -> AppResult<()> {
        match self.supervisor.stop().await? {
            StopOutcome::Graceful => info!("service stopped gracefully"),
            StopOutcome::Forced => warn!("service force-stopped"),
        }
        Ok(())
    }

    /// `health-check`: one supervision pass. If it restarts the service,
    /// the new instance lives in this process, so stay alive and keep
    /// supervising it.
    pub async fn health_check(&self) -> AppResult<()> {
        let verdict = self.supervisor.health_check().await?;
        info!(?verdict, "health check complete");

        if verdict == HealthVerdict::Restarted && self.supervisor.registry().is_installed() {
            info!("restarted service adopted by this process");
            return self.wait_and_stop(Some(self.health_check_interval)).await;
        }
        Ok(())
    }

    /// Block until ctrl-c or service exit, optionally running periodic
    /// health checks, then stop gracefully.
    async fn wait_and_stop(&self, health_every: Option<Duration>) -> AppResult<()> {
        let poll = Duration::from_secs(1);
        let mut next_health = health_every.map(|d| tokio::time::Instant::now() + d);

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "ctrl-c handler failed, stopping");
                    } else {
                        info!("interrupt received, stopping service");
                    }
                    return self.stop().await;
                }
                () = tokio::time::sleep(poll) => {
                    if !self.supervisor.registry().is_installed() {
                        info!("service exited, shutting down");
                        return Ok(());
                    }
                    if let Some(deadline) = next_health {
                        if tokio::time::Instant::now() >= deadline {
                            let verdict = self.supervisor.health_check().await?;
                            debug!(?verdict, "periodic health check");
                            next_health =
                                health_every.map(|d| tokio::time::Instant::now() + d);
                        }
                    }
                }
            }
        }
    }
}

/// Drains decoded feed messages. Real consumers replace this sink; the
/// daemon itself only logs what flows through.
fn spawn_feed_sink(mut feed_rx: mpsc::Receiver<FeedMessage>) {
    tokio::spawn(async move {
        while let Some(message) = feed_rx.recv().await {
            match message {
                FeedMessage::Feed(envelope) => {
                    debug!(
                        kind = ?envelope.kind,
                        instruments = envelope.feeds.len(),
                        current_ts = envelope.current_ts,
                        "feed envelope"
                    );
                }
                FeedMessage::Json(value) => {
                    debug!(%value, "json feed message");
                }
                FeedMessage::Raw(bytes) => {
                    debug!(len = bytes.len(), "raw feed frame");
                }
            }
        }
        debug!("feed channel closed");
    });
}
