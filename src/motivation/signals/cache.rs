//! Signal cache keyed by property identifier.
//!
//! Records are never mutated in place: a refresh writes a new record that supersedes the old
//! one. Expired records are ignored on read and can be swept with `purge_expired`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::SourceStatus;
use crate::motivation::domain::RawPropertySignals;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    pub signals: RawPropertySignals,
    pub sources: SourceStatus,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Storage abstraction for cached signals so the fetcher can run against any backend.
#[async_trait]
pub trait SignalCache: Send + Sync {
    /// Returns only unexpired records.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheRecord>, CacheError>;
    async fn put(&self, record: CacheRecord) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache payload could not be encoded: {0}")]
    Serialization(String),
}

#[derive(Debug, Default)]
pub struct InMemorySignalCache {
    records: RwLock<HashMap<String, CacheRecord>>,
}

impl InMemorySignalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired records, returning how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| record.is_fresh(now));
        before - records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SignalCache for InMemorySignalCache {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheRecord>, CacheError> {
        let records = self.records.read().await;
        Ok(records
            .get(key)
            .filter(|record| record.is_fresh(now))
            .cloned())
    }

    async fn put(&self, record: CacheRecord) -> Result<(), CacheError> {
        let mut records = self.records.write().await;
        records.insert(record.key.clone(), record);
        Ok(())
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSignalCache;

#[async_trait]
impl SignalCache for NoopSignalCache {
    async fn get(&self, _key: &str, _now: DateTime<Utc>) -> Result<Option<CacheRecord>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _record: CacheRecord) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(key: &str, fetched_at: DateTime<Utc>, ttl_minutes: i64) -> CacheRecord {
        CacheRecord {
            key: key.to_string(),
            signals: RawPropertySignals {
                owner_name: Some("Jane Doe".to_string()),
                ..RawPropertySignals::default()
            },
            sources: SourceStatus::default(),
            fetched_at,
            expires_at: fetched_at + Duration::minutes(ttl_minutes),
        }
    }

    #[tokio::test]
    async fn expired_records_are_not_returned() {
        let cache = InMemorySignalCache::new();
        let start = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        cache.put(record("prop-1", start, 60)).await.unwrap();

        let hit = cache.get("prop-1", start + Duration::minutes(59)).await.unwrap();
        assert!(hit.is_some());

        let miss = cache.get("prop-1", start + Duration::minutes(60)).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn refresh_supersedes_previous_record() {
        let cache = InMemorySignalCache::new();
        let start = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        cache.put(record("prop-1", start, 60)).await.unwrap();

        let mut refreshed = record("prop-1", start + Duration::minutes(30), 60);
        refreshed.signals.owner_name = Some("John Doe".to_string());
        cache.put(refreshed).await.unwrap();

        let hit = cache
            .get("prop-1", start + Duration::minutes(75))
            .await
            .unwrap()
            .expect("refreshed record still fresh");
        assert_eq!(hit.signals.owner_name.as_deref(), Some("John Doe"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_records() {
        let cache = InMemorySignalCache::new();
        let start = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        cache.put(record("old", start, 5)).await.unwrap();
        cache.put(record("new", start, 120)).await.unwrap();

        let removed = cache.purge_expired(start + Duration::minutes(10)).await;
        assert_eq!(removed, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn noop_cache_never_hits() {
        let cache = NoopSignalCache;
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        cache.put(record("prop-1", now, 60)).await.unwrap();
        assert!(cache.get("prop-1", now).await.unwrap().is_none());
    }
}
