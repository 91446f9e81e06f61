//! Typed view over the raw key/value store.
//!
//! All status transitions are single-key writes; timestamps are stored as
//! unix seconds so any process can parse them without a shared schema.

use crate::error::StoreResult;
use crate::keys;
use crate::store::{ServiceStatus, StatusStore};
use chrono::Utc;
use tracing::warn;
use upfeed_core::ConnectionStats;

#[derive(Clone)]
pub struct StatusBoard<S> {
    store: S,
}

impl<S: StatusStore> StatusBoard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current published status. An unparseable value is treated as absent.
    pub async fn read_status(&self) -> StoreResult<Option<ServiceStatus>> {
        let Some(raw) = self.store.get(keys::STATUS).await? else {
            return Ok(None);
        };
        match raw.parse::<ServiceStatus>() {
            Ok(status) => Ok(Some(status)),
            Err(e) => {
                warn!(%raw, error = %e, "ignoring unparseable status value");
                Ok(None)
            }
        }
    }

    pub async fn write_status(&self, status: ServiceStatus) -> StoreResult<()> {
        self.store.set(keys::STATUS, status.as_str()).await
    }

    /// Mark the service failed: status plus the error fields the
    /// out-of-process supervisors read.
    pub async fn fail(&self, message: &str) -> StoreResult<()> {
        self.write_status(ServiceStatus::Error).await?;
        self.store.set(keys::ERROR_MESSAGE, message).await?;
        self.store.set(keys::ERROR_TIME, &now_unix()).await
    }

    pub async fn clear_error_fields(&self) -> StoreResult<()> {
        self.store.delete(keys::ERROR_MESSAGE).await?;
        self.store.delete(keys::ERROR_TIME).await
    }

    pub async fn record_connected(&self, reconnect_count: u32) -> StoreResult<()> {
        self.store.set(keys::LAST_CONNECTED_AT, &now_unix()).await?;
        self.store
            .set(keys::RECONNECT_COUNT, &reconnect_count.to_string())
            .await
    }

    pub async fn record_disconnected(&self) -> StoreResult<()> {
        self.store
            .set(keys::LAST_DISCONNECTED_AT, &now_unix())
            .await
    }

    /// Non-fatal error observed during a session.
    pub async fn record_last_error(&self, message: &str) -> StoreResult<()> {
        self.store.set(keys::LAST_ERROR, message).await?;
        self.store.set(keys::LAST_ERROR_TIME, &now_unix()).await
    }

    pub async fn publish_stats(&self, stats: &ConnectionStats) -> StoreResult<()> {
        let json = serde_json::to_string(stats)?;
        self.store.set(keys::CONNECTION_STATS, &json).await
    }

    /// Latest published stats snapshot, if any. An unparseable snapshot is
    /// treated as absent.
    pub async fn read_stats(&self) -> StoreResult<Option<ConnectionStats>> {
        let Some(json) = self.store.get(keys::CONNECTION_STATS).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(stats) => Ok(Some(stats)),
            Err(e) => {
                warn!(error = %e, "ignoring unparseable connection stats");
                Ok(None)
            }
        }
    }

    /// Cleanup after a completed Stop: only the status key is removed, the
    /// audit fields (last_*) stay behind.
    pub async fn clear_transient(&self) -> StoreResult<()> {
        self.store.delete(keys::STATUS).await
    }
}

fn now_unix() -> String {
    Utc::now().timestamp().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStatusStore;

    fn board() -> StatusBoard<MemoryStatusStore> {
        StatusBoard::new(MemoryStatusStore::new())
    }

    #[tokio::test]
    async fn test_status_write_read() {
        let board = board();
        assert_eq!(board.read_status().await.unwrap(), None);

        board.write_status(ServiceStatus::Starting).await.unwrap();
        assert_eq!(
            board.read_status().await.unwrap(),
            Some(ServiceStatus::Starting)
        );
    }

    #[tokio::test]
    async fn test_unparseable_status_reads_as_absent() {
        let board = board();
        board.store().set(keys::STATUS, "rebooting").await.unwrap();
        assert_eq!(board.read_status().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fail_sets_error_fields() {
        let board = board();
        board.fail("Access token expired").await.unwrap();

        assert_eq!(
            board.read_status().await.unwrap(),
            Some(ServiceStatus::Error)
        );
        assert_eq!(
            board.store().get(keys::ERROR_MESSAGE).await.unwrap().as_deref(),
            Some("Access token expired")
        );
        assert!(board.store().get(keys::ERROR_TIME).await.unwrap().is_some());

        board.clear_error_fields().await.unwrap();
        assert!(board.store().get(keys::ERROR_MESSAGE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats_round_trip() {
        let board = board();
        assert!(board.read_stats().await.unwrap().is_none());

        let stats = ConnectionStats {
            connected: true,
            reconnect_attempts: 3,
            subscriptions_count: 7,
            last_message_time: None,
            seconds_since_last_message: Some(12),
        };
        board.publish_stats(&stats).await.unwrap();

        assert_eq!(board.read_stats().await.unwrap(), Some(stats));
    }

    #[tokio::test]
    async fn test_clear_transient_keeps_audit_fields() {
        let board = board();
        board.write_status(ServiceStatus::Stopped).await.unwrap();
        board.record_disconnected().await.unwrap();

        board.clear_transient().await.unwrap();

        assert_eq!(board.read_status().await.unwrap(), None);
        assert!(board
            .store()
            .get(keys::LAST_DISCONNECTED_AT)
            .await
            .unwrap()
            .is_some());
    }
}
