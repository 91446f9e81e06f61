//! Store trait and implementations.

use crate::error::StoreResult;
use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use std::sync::Arc;

/// Lifecycle status of the market data service, as published to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(Self::Stopped),
            "starting" => Ok(Self::Starting),
            "running" => Ok(Self::Running),
            "stopping" => Ok(Self::Stopping),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown service status: {other}")),
        }
    }
}

/// Shared, process-external key/value namespace used for supervision.
///
/// Only single-key consistency is required: each key has exactly one
/// writing process at a time, and readers tolerate missing keys.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Redis-backed store for cross-process supervision.
#[derive(Clone)]
pub struct RedisStatusStore {
    conn: redis::aio::ConnectionManager,
    namespace: String,
}

impl RedisStatusStore {
    /// Connect to Redis. `namespace` prefixes every key, e.g.
    /// `upstox:market_data`.
    pub async fn connect(url: &str, namespace: impl Into<String>) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            namespace: namespace.into(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(self.namespaced(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.namespaced(key)).await?;
        Ok(())
    }
}

/// In-memory store for tests and single-process runs.
#[derive(Clone, Default)]
pub struct MemoryStatusStore {
    map: Arc<DashMap<String, String>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.map.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_status_round_trip() {
        for status in [
            ServiceStatus::Stopped,
            ServiceStatus::Starting,
            ServiceStatus::Running,
            ServiceStatus::Stopping,
            ServiceStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<ServiceStatus>().unwrap(), status);
        }
        assert!("paused".parse::<ServiceStatus>().is_err());
    }

    #[tokio::test]
    async fn test_memory_store_get_set_delete() {
        let store = MemoryStatusStore::new();
        assert_eq!(store.get("status").await.unwrap(), None);

        store.set("status", "running").await.unwrap();
        assert_eq!(
            store.get("status").await.unwrap().as_deref(),
            Some("running")
        );

        store.delete("status").await.unwrap();
        assert_eq!(store.get("status").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_clone_shares_state() {
        let store = MemoryStatusStore::new();
        let clone = store.clone();

        store.set("k", "v").await.unwrap();
        assert_eq!(clone.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
