//! Caller-owned cache for the latest computed value (e.g. the live position
//! value), guarded by generation tickets.
//!
//! Take a ticket with [`VersionedCache::begin`] before starting a
//! computation and publish the result with it. A result carrying an older
//! generation than the one already stored is discarded, so a slow,
//! superseded computation can never overwrite a newer one.

use crate::domain::TimeMs;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Ticket identifying one computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    pub generation: Generation,
    pub value: T,
    pub updated_at: TimeMs,
}

#[derive(Debug)]
pub struct VersionedCache<T> {
    issued: AtomicU64,
    entry: RwLock<Option<CacheEntry<T>>>,
}

impl<T: Clone> VersionedCache<T> {
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            entry: RwLock::new(None),
        }
    }

    /// Issue a ticket newer than every ticket issued before it.
    pub fn begin(&self) -> Generation {
        Generation(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Store `value` unless a newer generation is already stored.
    ///
    /// Returns whether the value was stored.
    pub async fn publish(&self, generation: Generation, value: T) -> bool {
        let mut entry = self.entry.write().await;
        if let Some(current) = entry.as_ref() {
            if current.generation >= generation {
                tracing::debug!(
                    stale = generation.as_u64(),
                    current = current.generation.as_u64(),
                    "discarding stale computation"
                );
                return false;
            }
        }
        *entry = Some(CacheEntry {
            generation,
            value,
            updated_at: TimeMs::now(),
        });
        true
    }

    pub async fn current(&self) -> Option<CacheEntry<T>> {
        self.entry.read().await.clone()
    }

    pub async fn value(&self) -> Option<T> {
        self.entry.read().await.as_ref().map(|entry| entry.value.clone())
    }

    /// Whether a computation started after the stored value was produced.
    pub async fn is_superseded(&self) -> bool {
        let latest = Generation(self.issued.load(Ordering::SeqCst));
        match self.entry.read().await.as_ref() {
            Some(entry) => entry.generation < latest,
            None => latest.as_u64() > 0,
        }
    }

    /// Drop the stored value, forcing callers to recompute.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

impl<T: Clone> Default for VersionedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_stale_result_is_discarded() {
        let cache = VersionedCache::new();
        let first = cache.begin();
        let second = cache.begin();

        assert!(cache.publish(second, "fresh").await);
        assert!(!cache.publish(first, "stale").await);
        assert_eq!(cache.value().await, Some("fresh"));
    }

    #[tokio::test]
    async fn in_order_results_replace_each_other() {
        let cache = VersionedCache::new();
        let first = cache.begin();
        assert!(cache.publish(first, 1).await);
        let second = cache.begin();
        assert!(cache.is_superseded().await);
        assert!(cache.publish(second, 2).await);
        assert!(!cache.is_superseded().await);

        let entry = cache.current().await.unwrap();
        assert_eq!(entry.generation, second);
        assert_eq!(entry.value, 2);
    }

    #[tokio::test]
    async fn invalidate_clears_value() {
        let cache = VersionedCache::new();
        let generation = cache.begin();
        cache.publish(generation, 5).await;
        cache.invalidate().await;
        assert_eq!(cache.value().await, None);
    }

    #[test]
    fn tickets_are_monotonic() {
        let cache: VersionedCache<u8> = VersionedCache::new();
        let a = cache.begin();
        let b = cache.begin();
        assert!(b > a);
    }
}
