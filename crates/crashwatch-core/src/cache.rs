//! In-memory revalidation cache for readings and quotes.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::data_source::SourceClass;

/// Defines how a single call interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a live entry if present; otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Always fetch, then overwrite the entry.
    Refresh,
    /// Always fetch; never read or write the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Revalidation window per source class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevalidationWindows {
    pub quotes: Duration,
    pub macro_series: Duration,
    /// Lifetime of fallback readings, kept short so recovery shows up promptly.
    pub fallback: Duration,
}

impl Default for RevalidationWindows {
    fn default() -> Self {
        Self {
            quotes: Duration::from_secs(60),
            macro_series: Duration::from_secs(3_600),
            fallback: Duration::from_secs(60),
        }
    }
}

impl RevalidationWindows {
    pub const fn for_class(&self, class: SourceClass) -> Duration {
        match class {
            SourceClass::Quote => self.quotes,
            SourceClass::Macro => self.macro_series,
        }
    }

    /// Window for an entry; fallbacks never outlive their class window.
    pub fn for_entry(&self, class: SourceClass, is_fallback: bool) -> Duration {
        let window = self.for_class(class);
        if is_fallback {
            window.min(self.fallback)
        } else {
            window
        }
    }

    pub const fn disabled() -> Self {
        Self {
            quotes: Duration::ZERO,
            macro_series: Duration::ZERO,
            fallback: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner<K, V> {
    map: HashMap<K, CacheEntry<V>>,
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, key: K, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.map.insert(key, CacheEntry { value, expires_at });
    }

    fn clear_expired(&mut self) {
        let now = Instant::now();
        self.map.retain(|_, entry| entry.expires_at > now);
    }
}

/// Thread-safe keyed cache with one entry per key and whole-entry replace.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<K, V>>>,
}

impl<K, V> Clone for CacheStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for CacheStore<K, V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
            })),
        }
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key` while its window is open.
    pub async fn get(&self, key: &K) -> Option<V> {
        let store = self.inner.read().await;
        store.get(key)
    }

    /// Overwrites the entry for `key`. A zero `ttl` stores nothing.
    pub async fn put(&self, key: K, value: V, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let mut store = self.inner.write().await;
        store.put(key, value, ttl);
    }

    pub async fn remove(&self, key: &K) {
        let mut store = self.inner.write().await;
        store.map.remove(key);
    }

    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        store.clear_expired();
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_store_basic_operations() {
        let cache = CacheStore::<&'static str, u32>::new();

        assert!(cache.get(&"key1").await.is_none());

        cache.put("key1", 1, Duration::from_secs(1)).await;
        assert_eq!(cache.get(&"key1").await, Some(1));

        cache.put("key1", 2, Duration::from_secs(1)).await;
        assert_eq!(cache.get(&"key1").await, Some(2));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let cache = CacheStore::<&'static str, u32>::new();

        cache.put("key1", 1, Duration::from_millis(50)).await;
        assert!(cache.get(&"key1").await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&"key1").await.is_none());

        cache.clear_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let cache = CacheStore::<&'static str, u32>::new();

        cache.put("key1", 1, Duration::ZERO).await;
        assert!(cache.get(&"key1").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn test_windows_per_class() {
        let windows = RevalidationWindows::default();

        assert_eq!(windows.for_class(SourceClass::Quote), Duration::from_secs(60));
        assert_eq!(
            windows.for_class(SourceClass::Macro),
            Duration::from_secs(3_600)
        );
        assert_eq!(
            windows.for_entry(SourceClass::Macro, true),
            Duration::from_secs(60)
        );
        assert_eq!(
            windows.for_entry(SourceClass::Macro, false),
            Duration::from_secs(3_600)
        );
    }

    #[test]
    fn test_cache_mode_default() {
        let mode = CacheMode::default();
        assert_eq!(mode, CacheMode::Use);
        assert!(mode.reads() && mode.writes());
        assert!(!CacheMode::Refresh.reads());
        assert!(!CacheMode::Bypass.writes());
    }
}
