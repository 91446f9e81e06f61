//! Start, stop and health-check the feed service.
//!
//! Each operation is safe to invoke from a separate process as long as all
//! of them share the same status store namespace; only restart and forced
//! stop need the in-process [`ServiceRegistry`].

use crate::config::SupervisorConfig;
use crate::error::SupervisorResult;
use crate::registry::{ServiceHandle, ServiceRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use upfeed_core::CredentialProvider;
use upfeed_status::{ServiceStatus, StatusBoard, StatusStore};
use upfeed_ws::{
    ConnectionEvent, ConnectionManager, ConnectionState, FeedAuthorizer, FeedMessage,
};

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new service instance was spawned.
    Started,
    /// An instance is already starting or running; nothing was done.
    AlreadyRunning,
    /// The service could not start; the error status has been published.
    Failed,
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The service confirmed the stop within the polling budget.
    Graceful,
    /// The polling budget ran out and the connection was force-closed.
    Forced,
}

/// Result of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    /// Outside the active window; nothing was checked.
    Skipped,
    /// Connected and receiving data.
    Healthy,
    /// Disconnected but still within its reconnection budget.
    Recovering,
    /// The service was restarted.
    Restarted,
    /// Transitional status (starting or stopping) observed; left alone.
    Observed(ServiceStatus),
}

/// Supervises one feed service instance.
pub struct Supervisor<S, P> {
    board: StatusBoard<S>,
    provider: P,
    registry: ServiceRegistry,
    authorizer: Arc<dyn FeedAuthorizer>,
    feed_tx: mpsc::Sender<FeedMessage>,
    config: SupervisorConfig,
}

impl<S, P> Supervisor<S, P>
where
    S: StatusStore + Clone + Send + Sync + 'static,
    P: CredentialProvider,
{
    pub fn new(
        board: StatusBoard<S>,
        provider: P,
        registry: ServiceRegistry,
        authorizer: Arc<dyn FeedAuthorizer>,
        feed_tx: mpsc::Sender<FeedMessage>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            board,
            provider,
            registry,
            authorizer,
            feed_tx,
            config,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Start the feed service: spawn the connection manager and its
    /// supporting tasks, wait out the grace period, then subscribe and
    /// publish `running`.
    ///
    /// Exactly one instance may be active per store namespace; a second
    /// start is refused while the published status is starting or running.
    pub async fn start(&self) -> SupervisorResult<StartOutcome> {
        info!("starting market data service");

        if let Some(status) = self.board.read_status().await? {
            if matches!(status, ServiceStatus::Starting | ServiceStatus::Running) {
                warn!(%status, "service already active, refusing second instance");
                return Ok(StartOutcome::AlreadyRunning);
            }
        }

        let credential = match self.provider.credential() {
            Ok(credential) => credential,
            Err(e) => {
                error!(error = %e, "no usable credential, not starting");
                self.board.fail(&e.to_string()).await?;
                return Ok(StartOutcome::Failed);
            }
        };
        if credential.is_expired() {
            error!("access token expired, not starting");
            self.board.fail("Access token expired").await?;
            return Ok(StartOutcome::Failed);
        }

        self.board.write_status(ServiceStatus::Starting).await?;

        let (event_tx, event_rx) = mpsc::channel(64);
        let manager = Arc::new(ConnectionManager::new(
            self.config.feed.clone(),
            credential.access_token,
            Arc::clone(&self.authorizer),
            self.feed_tx.clone(),
            event_tx,
        ));
        self.registry.install(ServiceHandle::new(Arc::clone(&manager)));

        self.spawn_event_task(Arc::clone(&manager), event_rx);
        self.spawn_run_task(Arc::clone(&manager));
        self.spawn_control_task(Arc::clone(&manager));

        // Give the first connection attempt time to land before deciding
        // whether to subscribe now or leave it to the session replay.
        tokio::time::sleep(self.config.grace_period).await;

        if manager.is_connected() {
            if self.config.instrument_keys.is_empty() {
                warn!("no instruments configured, nothing to subscribe");
            } else {
                manager
                    .subscribe(&self.config.instrument_keys, self.config.mode)
                    .await;
                info!(
                    count = self.config.instrument_keys.len(),
                    mode = %self.config.mode,
                    "initial subscription sent"
                );
            }
            self.board.write_status(ServiceStatus::Running).await?;
            self.board.clear_error_fields().await?;
            info!("market data service running");
        } else {
            warn!("feed not connected after grace period, subscription deferred");
        }

        Ok(StartOutcome::Started)
    }

    /// Stop the feed service: publish `stopping`, poll for the service to
    /// confirm, and force-close the connection if it never does.
    pub async fn stop(&self) -> SupervisorResult<StopOutcome> {
        info!("stopping market data service");
        self.board.write_status(ServiceStatus::Stopping).await?;

        for poll in 1..=self.config.stop_max_polls {
            tokio::time::sleep(self.config.stop_poll_interval).await;
            if self.board.read_status().await? == Some(ServiceStatus::Stopped) {
                info!(polls = poll, "service stopped gracefully");
                self.board.clear_transient().await?;
                return Ok(StopOutcome::Graceful);
            }
        }

        warn!(
            polls = self.config.stop_max_polls,
            "graceful stop timed out, force-closing connection"
        );
        if let Some(handle) = self.registry.take() {
            handle.disconnect();
        }
        self.board
            .record_last_error("graceful stop timed out, connection force-closed")
            .await?;
        self.board.write_status(ServiceStatus::Stopped).await?;
        self.board.clear_transient().await?;
        Ok(StopOutcome::Forced)
    }

    /// Periodic health check. Within the active window the service must be
    /// running, connected and receiving data; anything else either waits
    /// (bounded reconnection in progress) or triggers a restart.
    pub async fn health_check(&self) -> SupervisorResult<HealthVerdict> {
        let now = chrono::Local::now().naive_local();
        if !self.config.active_window.contains(now) {
            debug!("outside active window, health check skipped");
            return Ok(HealthVerdict::Skipped);
        }

        let status = self.board.read_status().await?;
        match status {
            None | Some(ServiceStatus::Stopped) | Some(ServiceStatus::Error) => {
                warn!(?status, "service should be running, restarting");
                self.restart().await?;
                Ok(HealthVerdict::Restarted)
            }
            Some(ServiceStatus::Running) => self.check_running_service().await,
            Some(other) => {
                info!(%other, "service in transitional state, leaving it alone");
                Ok(HealthVerdict::Observed(other))
            }
        }
    }

    async fn check_running_service(&self) -> SupervisorResult<HealthVerdict> {
        let Some(handle) = self.registry.get() else {
            warn!("status says running but no live handle in this process, restarting");
            self.restart().await?;
            return Ok(HealthVerdict::Restarted);
        };

        if !handle.is_connected() {
            // Read the attempt count from the live handle; the published
            // snapshot can be a full poll interval old.
            let attempts = handle.stats().reconnect_attempts;
            if attempts >= self.config.restart_after_reconnects {
                error!(attempts, "reconnection not converging, restarting");
                self.restart().await?;
                return Ok(HealthVerdict::Restarted);
            }
            info!(attempts, "service disconnected but reconnecting, waiting");
            return Ok(HealthVerdict::Recovering);
        }

        let stats = handle.stats();
        if let Some(silent) = stats.seconds_since_last_message {
            if silent > self.config.stale_after_secs {
                error!(
                    silent_for_secs = silent,
                    "connected but silent for too long, restarting"
                );
                self.restart().await?;
                return Ok(HealthVerdict::Restarted);
            }
        }

        debug!(
            subscriptions = stats.subscriptions_count,
            seconds_since_last_message = ?stats.seconds_since_last_message,
            "service healthy"
        );
        Ok(HealthVerdict::Healthy)
    }

    /// Tear down whatever is live and start over, then read back the
    /// resulting status after a short delay.
    async fn restart(&self) -> SupervisorResult<()> {
        info!("restarting market data service");
        if let Some(handle) = self.registry.take() {
            handle.disconnect();
        }
        self.board.write_status(ServiceStatus::Stopped).await?;

        let outcome = self.start().await?;
        if outcome == StartOutcome::Failed {
            error!("restart failed before spawning the service");
            return Ok(());
        }

        tokio::time::sleep(self.config.restart_verify_delay).await;
        match self.board.read_status().await? {
            Some(ServiceStatus::Running) => info!("service restarted and running"),
            Some(ServiceStatus::Starting) => {
                info!("service restarted, still establishing the connection")
            }
            other => error!(?other, "service restart did not converge"),
        }
        Ok(())
    }

    /// Forwards connection lifecycle events into the status store.
    fn spawn_event_task(
        &self,
        manager: Arc<ConnectionManager>,
        mut event_rx: mpsc::Receiver<ConnectionEvent>,
    ) {
        let board = self.board.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let result = match event {
                    ConnectionEvent::Connected => {
                        info!("feed connected");
                        let attempts = manager.connection_stats().reconnect_attempts;
                        board.record_connected(attempts).await
                    }
                    ConnectionEvent::Disconnected { code, reason } => {
                        warn!(code, %reason, "feed disconnected");
                        board.record_disconnected().await
                    }
                    ConnectionEvent::Error { message, fatal } => {
                        if fatal {
                            error!(%message, "fatal feed error");
                            board.fail(&message).await
                        } else {
                            warn!(%message, "feed error");
                            board.record_last_error(&message).await
                        }
                    }
                };
                if let Err(e) = result {
                    warn!(error = %e, "failed to publish connection event");
                }
            }
            debug!("event channel closed");
        });
    }

    /// Drives the connection manager to completion and publishes the final
    /// status when it exits.
    fn spawn_run_task(&self, manager: Arc<ConnectionManager>) {
        let board = self.board.clone();
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let result = manager.run().await;
            // The handle must be gone before the final status lands, so a
            // reader that observes `stopped` never finds a live handle. If
            // the slot no longer holds this manager, a stop or restart took
            // over the lifecycle and owns the status instead.
            if !registry.clear_if_current(&manager) {
                debug!("manager already replaced, final status left to its owner");
                return;
            }
            match result {
                Ok(()) => {
                    info!("connection manager exited cleanly");
                    if let Err(e) = board.write_status(ServiceStatus::Stopped).await {
                        warn!(error = %e, "failed to publish stopped status");
                    }
                }
                Err(e) => {
                    error!(error = %e, "connection manager terminated");
                    if let Err(store_err) = board.fail(&e.to_string()).await {
                        warn!(error = %store_err, "failed to publish error status");
                    }
                }
            }
        });
    }

    /// Combined periodic tick: publish the stats snapshot and watch for an
    /// out-of-process stop request.
    fn spawn_control_task(&self, manager: Arc<ConnectionManager>) {
        let board = self.board.clone();
        let interval = self.config.control_poll_interval;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval_at(
                tokio::time::Instant::now() + interval,
                interval,
            );
            loop {
                tick.tick().await;
                if manager.is_shutdown() || manager.state() == ConnectionState::Closed {
                    debug!("manager gone, control tick exiting");
                    return;
                }
                match board.read_status().await {
                    Ok(Some(ServiceStatus::Stopping)) => {
                        info!("stop request observed, disconnecting");
                        manager.disconnect();
                        return;
                    }
                    Ok(_) => {
                        let stats = manager.connection_stats();
                        info!(
                            connected = stats.connected,
                            subscriptions = stats.subscriptions_count,
                            reconnect_attempts = stats.reconnect_attempts,
                            seconds_since_last_message = ?stats.seconds_since_last_message,
                            "connection stats"
                        );
                        if let Err(e) = board.publish_stats(&stats).await {
                            warn!(error = %e, "failed to publish connection stats");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "status read failed in control tick");
                    }
                }
            }
        });
    }
}
