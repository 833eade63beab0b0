//! Key-value store interface
//!
//! The result cache talks to its backing store only through [`KeyValueStore`].
//! [`CacheManager`](crate::CacheManager) binds it to Redis; [`MemoryStore`]
//! keeps entries in process memory.

use crate::errors::CacheError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Unconditional write with expiry
    async fn set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Write only if the key is present. Returns false (and writes nothing) otherwise.
    async fn update(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<bool, CacheError>;

    /// Returns false if the key did not exist
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Expired entries are swept once every this many writes
const SWEEP_EVERY: usize = 64;

/// In-process store with per-entry expiry
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidTtl(ttl_seconds));
        }

        let now = Instant::now();
        let entry = Entry {
            value: value.to_vec(),
            expires_at: now + Duration::from_secs(ttl_seconds),
        };

        let mut entries = self.entries.lock().await;
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            entries.retain(|_, e| e.is_live(now));
        }
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn update(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<bool, CacheError> {
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidTtl(ttl_seconds));
        }

        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.value = value.to_vec();
                entry.expires_at = now + Duration::from_secs(ttl_seconds);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_only_existing_keys() {
        let store = MemoryStore::new();

        assert!(!store.update("missing", b"v", 60).await.unwrap());
        assert!(!store.exists("missing").await.unwrap());

        store.set("present", b"old", 60).await.unwrap();
        assert!(store.update("present", b"new", 60).await.unwrap());
        assert_eq!(store.get("present").await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_reports_absence() {
        let store = MemoryStore::new();
        assert!(!store.delete("nothing").await.unwrap());

        store.set("k", b"v", 60).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryStore::new();
        store.set("k", b"v", 5).await.unwrap();
        assert!(store.exists("k").await.unwrap());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!store.exists("k").await.unwrap());
        assert!(!store.update("k", b"v2", 5).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_entries() {
        let store = MemoryStore::new();
        for i in 0..1000 {
            store.set(&format!("page:{}", i), b"rows", 1).await.unwrap();
        }

        tokio::time::advance(Duration::from_secs(10)).await;
        for i in 0..SWEEP_EVERY {
            store.set(&format!("fresh:{}", i), b"rows", 60).await.unwrap();
        }

        assert_eq!(store.len().await, SWEEP_EVERY);
        assert!(store.entries.lock().await.len() <= SWEEP_EVERY);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set("k", b"v", 0).await,
            Err(CacheError::InvalidTtl(0))
        ));
    }
}
