//! # Cache Layer
//!
//! Time-boxed memoization of store reads, one TTL per entity kind.
//!
//! ## Lifecycle of an Entry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get_or_load(Products, "active", load)                                 │
//! │       │                                                                 │
//! │       ├── fresh entry (age < TTL)  ──► return clone                    │
//! │       │                                                                 │
//! │       └── missing / expired        ──► load() from the store           │
//! │                                         │                               │
//! │                                         ├── kind invalidated while      │
//! │                                         │   loading? return, don't keep │
//! │                                         └── otherwise store + return    │
//! │                                                                         │
//! │  Writers:  invalidate(kind)   sale write ──► Sales + Products          │
//! │            invalidate_all()   connectivity restored                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store stays the source of truth. A cleared cache is just a miss.
//!
//! ## TTLs
//! | Kind        | TTL group | Default |
//! |-------------|-----------|---------|
//! | `Products`  | catalog   | 5 min   |
//! | `Sales`     | catalog   | 5 min   |
//! | `Customers` | analytics | 3 min   |
//! | `Insights`  | analytics | 3 min   |

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Which collection (or derived view) a cached value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Products,
    Sales,
    Customers,
    Insights,
}

impl CacheKind {
    pub const ALL: [CacheKind; 4] = [
        CacheKind::Products,
        CacheKind::Sales,
        CacheKind::Customers,
        CacheKind::Insights,
    ];

    fn ttl(self, ttl: &CacheTtl) -> Duration {
        match self {
            CacheKind::Products | CacheKind::Sales => ttl.catalog,
            CacheKind::Customers | CacheKind::Insights => ttl.analytics,
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Products => write!(f, "products"),
            CacheKind::Sales => write!(f, "sales"),
            CacheKind::Customers => write!(f, "customers"),
            CacheKind::Insights => write!(f, "insights"),
        }
    }
}

/// Time-to-live per TTL group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    /// Products and sales.
    pub catalog: Duration,
    /// Customers and insights.
    pub analytics: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        CacheTtl {
            catalog: Duration::from_secs(5 * 60),
            analytics: Duration::from_secs(3 * 60),
        }
    }
}

struct Entry {
    stored_at: Instant,
    value: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct State {
    entries: HashMap<(CacheKind, String), Entry>,
    /// Bumped on every invalidation of a kind.
    generations: HashMap<CacheKind, u64>,
}

impl State {
    fn generation(&self, kind: CacheKind) -> u64 {
        self.generations.get(&kind).copied().unwrap_or(0)
    }

    fn clear(&mut self, kind: CacheKind) {
        self.entries.retain(|(k, _), _| *k != kind);
        *self.generations.entry(kind).or_insert(0) += 1;
    }
}

/// Shared, injectable cache.
///
/// Values are keyed by kind plus a scope string (`"active"`,
/// `"recent:20"`, `"customer:<id>"`), so one kind can hold several views of
/// its collection; invalidating the kind drops them all.
pub struct Cache {
    ttl: CacheTtl,
    state: RwLock<State>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl Cache {
    pub fn new(ttl: CacheTtl) -> Self {
        Cache {
            ttl,
            state: RwLock::new(State::default()),
        }
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    /// Returns the cached value if present and younger than its TTL.
    pub async fn get<T>(&self, kind: CacheKind, scope: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let state = self.state.read().await;
        let entry = state.entries.get(&(kind, scope.to_string()))?;

        if entry.stored_at.elapsed() >= kind.ttl(&self.ttl) {
            return None;
        }

        entry.value.downcast_ref::<T>().cloned()
    }

    /// Stores a value under `(kind, scope)`.
    pub async fn put<T>(&self, kind: CacheKind, scope: &str, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut state = self.state.write().await;
        state.entries.insert(
            (kind, scope.to_string()),
            Entry {
                stored_at: Instant::now(),
                value: Arc::new(value),
            },
        );
    }

    /// Cached value, or the result of `load` (kept unless the kind was
    /// invalidated while loading).
    pub async fn get_or_load<T, E, F, Fut>(&self, kind: CacheKind, scope: &str, load: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(kind, scope).await {
            debug!(kind = %kind, scope = scope, "Cache hit");
            return Ok(hit);
        }

        let generation = self.state.read().await.generation(kind);
        debug!(kind = %kind, scope = scope, "Cache miss, reading store");
        let value = load().await?;

        let mut state = self.state.write().await;
        if state.generation(kind) == generation {
            state.entries.insert(
                (kind, scope.to_string()),
                Entry {
                    stored_at: Instant::now(),
                    value: Arc::new(value.clone()),
                },
            );
        } else {
            debug!(kind = %kind, scope = scope, "Invalidated during load, not caching");
        }

        Ok(value)
    }

    /// Drops every entry of one kind.
    pub async fn invalidate(&self, kind: CacheKind) {
        self.state.write().await.clear(kind);
        debug!(kind = %kind, "Cache invalidated");
    }

    /// Drops several kinds under one lock.
    pub async fn invalidate_many(&self, kinds: &[CacheKind]) {
        let mut state = self.state.write().await;
        for kind in kinds {
            state.clear(*kind);
        }
        debug!(?kinds, "Cache invalidated");
    }

    /// Drops everything.
    pub async fn invalidate_all(&self) {
        self.invalidate_many(&CacheKind::ALL).await;
    }

    /// Number of live (unexpired) entries of a kind.
    pub async fn len(&self, kind: CacheKind) -> usize {
        let ttl = kind.ttl(&self.ttl);
        self.state
            .read()
            .await
            .entries
            .iter()
            .filter(|((k, _), e)| *k == kind && e.stored_at.elapsed() < ttl)
            .count()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Cache::new(CacheTtl::default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_value_unchanged_within_ttl() {
        let cache = Cache::default();
        cache.put(CacheKind::Products, "active", vec![1, 2, 3]).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(
            cache.get::<Vec<i32>>(CacheKind::Products, "active").await,
            Some(vec![1, 2, 3])
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get::<Vec<i32>>(CacheKind::Products, "active").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analytics_kinds_expire_sooner() {
        let cache = Cache::default();
        cache.put(CacheKind::Customers, "active", 7u32).await;
        cache.put(CacheKind::Sales, "recent:10", 9u32).await;

        tokio::time::advance(Duration::from_secs(180)).await;
        assert_eq!(cache.get::<u32>(CacheKind::Customers, "active").await, None);
        assert_eq!(cache.get::<u32>(CacheKind::Sales, "recent:10").await, Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_load_reloads_after_expiry() {
        let cache = Cache::default();
        let loads = AtomicUsize::new(0);
        let load = || async {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(String::from("fresh"))
        };

        cache.get_or_load(CacheKind::Insights, "all", load).await.unwrap();
        cache.get_or_load(CacheKind::Insights, "all", load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(181)).await;
        cache.get_or_load(CacheKind::Insights, "all", load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_one_kind_keeps_others() {
        let cache = Cache::default();
        cache.put(CacheKind::Sales, "recent:10", 1u8).await;
        cache.put(CacheKind::Sales, "customer:c-1", 2u8).await;
        cache.put(CacheKind::Products, "active", 3u8).await;

        cache.invalidate(CacheKind::Sales).await;
        assert_eq!(cache.len(CacheKind::Sales).await, 0);
        assert_eq!(cache.get::<u8>(CacheKind::Products, "active").await, Some(3));

        cache.invalidate_all().await;
        assert_eq!(cache.get::<u8>(CacheKind::Products, "active").await, None);
    }

    #[tokio::test]
    async fn test_load_racing_invalidation_is_not_kept() {
        let cache = Cache::default();

        let value = cache
            .get_or_load(CacheKind::Customers, "active", || async {
                cache.invalidate(CacheKind::Customers).await;
                Ok::<_, ()>(41u32)
            })
            .await
            .unwrap();

        assert_eq!(value, 41);
        assert_eq!(cache.get::<u32>(CacheKind::Customers, "active").await, None);
    }

    #[tokio::test]
    async fn test_failed_load_propagates_and_caches_nothing() {
        let cache = Cache::default();
        let result = cache
            .get_or_load::<u32, _, _, _>(CacheKind::Products, "active", || async { Err("offline") })
            .await;

        assert_eq!(result, Err("offline"));
        assert_eq!(cache.len(CacheKind::Products).await, 0);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_miss() {
        let cache = Cache::default();
        cache.put(CacheKind::Products, "active", 5u32).await;
        assert_eq!(cache.get::<String>(CacheKind::Products, "active").await, None);
    }
}
