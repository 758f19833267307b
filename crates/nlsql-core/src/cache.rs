//! Allowed-Values Cache (S1) — a stale-while-revalidate cache of distinct
//! column values, bounded per column, TTL-refreshed (§4.7).
//!
//! The cache owns no SQL client itself; it is generic over an injected
//! [`AllowedValuesLoader`] (implemented against Postgres in `nlsql-db`),
//! per §9 "Global state: none except S1's cache — treat as an injected
//! object, not a module global."

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nlsql_error::CacheError;
use tokio::sync::{Mutex, RwLock};

use crate::model::AllowedValuesEntry;

/// Performs the actual `SELECT DISTINCT` load; implemented against a real
/// database by `nlsql-db`.
#[async_trait]
pub trait AllowedValuesLoader: Send + Sync {
    /// Loads up to `limit + 1` distinct values, ordered, so the cache can
    /// detect overflow without a separate `COUNT(*)`.
    async fn load(&self, table: &str, column: &str, limit: usize) -> Result<Vec<String>, CacheError>;
}

struct Entry {
    state: RwLock<Option<AllowedValuesEntry>>,
    load_lock: Mutex<()>,
    refreshing: AtomicBool,
}

impl Entry {
    fn new() -> Self {
        Self {
            state: RwLock::new(None),
            load_lock: Mutex::new(()),
            refreshing: AtomicBool::new(false),
        }
    }
}

/// Configuration for the cache, sourced from `ALLOWED_VALUES_TTL_SEC` /
/// `ALLOWED_VALUES_MAX` (§6.4).
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_values: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_values: 500,
        }
    }
}

/// Object-safe view over the cache, so callers (the parameter extractor)
/// don't need to be generic over the loader implementation.
#[async_trait]
pub trait AllowedValuesProvider: Send + Sync {
    async fn get(&self, table: &str, column: &str) -> (Vec<String>, bool);
}

type CacheKey = (String, String);

/// Singleton, per-process cache. Shared across all requests via `Arc` in
/// `Dependencies`.
pub struct AllowedValuesCache<L: AllowedValuesLoader> {
    entries: RwLock<HashMap<CacheKey, Arc<Entry>>>,
    loader: Arc<L>,
    config: CacheConfig,
}

impl<L: AllowedValuesLoader + 'static> AllowedValuesCache<L> {
    #[must_use]
    pub fn new(loader: Arc<L>, config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            loader,
            config,
        }
    }

    async fn entry_for(&self, key: &CacheKey) -> Arc<Entry> {
        if let Some(existing) = self.entries.read().await.get(key) {
            return existing.clone();
        }
        let mut entries = self.entries.write().await;
        entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Entry::new()))
            .clone()
    }

    /// `get(table, column) -> (values, is_partial)` per §4.7.
    ///
    /// - **Fresh hit**: returns immediately.
    /// - **Stale hit**: returns the stale values immediately; spawns a
    ///   background refresh if one isn't already in flight.
    /// - **Miss**: synchronously loads, coalescing concurrent misses on the
    ///   same key (singleflight via `load_lock`).
    /// - **Load failure**: returns `(vec![], false)`; does not cache the
    ///   empty result, so the next call retries.
    pub async fn get(&self, table: &str, column: &str) -> (Vec<String>, bool) {
        let key = (table.to_string(), column.to_string());
        let entry = self.entry_for(&key).await;

        let snapshot = entry.state.read().await.clone();
        match snapshot {
            Some(cached) if cached.loaded_at.elapsed() < self.config.ttl => (cached.values, cached.is_partial),
            Some(cached) => {
                // Stale-while-revalidate: serve stale immediately, refresh
                // in the background if nobody else already is.
                if !entry.refreshing.swap(true, Ordering::AcqRel) {
                    let entry_bg = entry.clone();
                    let loader = self.loader.clone();
                    let config = self.config;
                    let table = table.to_string();
                    let column = column.to_string();
                    tokio::spawn(async move {
                        let _guard = entry_bg.load_lock.lock().await;
                        if let Ok(loaded) = load_and_clamp(loader.as_ref(), &table, &column, config).await {
                            *entry_bg.state.write().await = Some(loaded);
                        } else {
                            tracing::warn!(table, column, "background allowed-values refresh failed");
                        }
                        entry_bg.refreshing.store(false, Ordering::Release);
                    });
                }
                (cached.values, cached.is_partial)
            }
            None => {
                // Miss: take the load lock so concurrent misses on the same
                // key coalesce onto one DB round trip.
                let _guard = entry.load_lock.lock().await;
                // Re-check: another caller may have populated it while we
                // waited for the lock.
                if let Some(cached) = entry.state.read().await.clone() {
                    return (cached.values, cached.is_partial);
                }
                match load_and_clamp(self.loader.as_ref(), table, column, self.config).await {
                    Ok(loaded) => {
                        let result = (loaded.values.clone(), loaded.is_partial);
                        *entry.state.write().await = Some(loaded);
                        result
                    }
                    Err(e) => {
                        tracing::warn!(table, column, error = %e, "allowed-values load failed");
                        (Vec::new(), false)
                    }
                }
            }
        }
    }
}

async fn load_and_clamp<L: AllowedValuesLoader + ?Sized>(
    loader: &L,
    table: &str,
    column: &str,
    config: CacheConfig,
) -> Result<AllowedValuesEntry, CacheError> {
    let mut values = loader.load(table, column, config.max_values).await?;
    let is_partial = values.len() > config.max_values;
    if is_partial {
        values.truncate(config.max_values);
    }
    Ok(AllowedValuesEntry {
        values,
        loaded_at: Instant::now(),
        is_partial,
    })
}

#[async_trait]
impl<L: AllowedValuesLoader + 'static> AllowedValuesProvider for AllowedValuesCache<L> {
    async fn get(&self, table: &str, column: &str) -> (Vec<String>, bool) {
        AllowedValuesCache::get(self, table, column).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingLoader {
        calls: AtomicUsize,
        rows: Vec<String>,
    }

    #[async_trait]
    impl AllowedValuesLoader for CountingLoader {
        async fn load(&self, _table: &str, _column: &str, _limit: usize) -> Result<Vec<String>, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }
    }

    #[tokio::test]
    async fn exact_at_max_values_is_not_partial() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            rows: (0..500).map(|i| i.to_string()).collect(),
        });
        let cache = AllowedValuesCache::new(loader, CacheConfig { ttl: Duration::from_secs(600), max_values: 500 });
        let (values, is_partial) = cache.get("t", "c").await;
        assert_eq!(values.len(), 500);
        assert!(!is_partial);
    }

    #[tokio::test]
    async fn over_max_values_is_partial_and_clamped() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            rows: (0..501).map(|i| i.to_string()).collect(),
        });
        let cache = AllowedValuesCache::new(loader, CacheConfig { ttl: Duration::from_secs(600), max_values: 500 });
        let (values, is_partial) = cache.get("t", "c").await;
        assert_eq!(values.len(), 500);
        assert!(is_partial);
    }

    #[tokio::test]
    async fn concurrent_miss_coalesces_to_one_load() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            rows: vec!["a".to_string()],
        });
        let cache = Arc::new(AllowedValuesCache::new(loader.clone(), CacheConfig::default()));

        let c1 = cache.clone();
        let c2 = cache.clone();
        let (r1, r2) = tokio::join!(c1.get("t", "c"), c2.get("t", "c"));
        assert_eq!(r1.0, vec!["a".to_string()]);
        assert_eq!(r2.0, vec!["a".to_string()]);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_failure_is_not_cached_and_retries_next_call() {
        struct FlakyLoader {
            calls: AtomicUsize,
        }
        #[async_trait]
        impl AllowedValuesLoader for FlakyLoader {
            async fn load(&self, _table: &str, _column: &str, _limit: usize) -> Result<Vec<String>, CacheError> {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(CacheError::Unavailable)
                } else {
                    Ok(vec!["recovered".to_string()])
                }
            }
        }
        let loader = Arc::new(FlakyLoader { calls: AtomicUsize::new(0) });
        let cache = AllowedValuesCache::new(loader, CacheConfig::default());

        let (values, is_partial) = cache.get("t", "c").await;
        assert!(values.is_empty());
        assert!(!is_partial);

        let (values, _) = cache.get("t", "c").await;
        assert_eq!(values, vec!["recovered".to_string()]);
    }
}
