use super::{MetadataRecord, MetadataResolver, ResolveError};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for a resolved record (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

type Resolution = Result<Arc<MetadataRecord>, ResolveError>;
type InFlight = Shared<BoxFuture<'static, Resolution>>;

struct CachedRecord {
    record: Arc<MetadataRecord>,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedRecord>,
    in_flight: HashMap<String, InFlight>,
}

/// Time-bounded, single-flight memo in front of [`MetadataResolver`].
///
/// - A successful resolution is served for `ttl`, then treated as absent.
///   Expired entries are replaced on the next lookup, never swept.
/// - Concurrent lookups of a locator with nothing cached share one
///   resolution and all observe its result or its error.
/// - Failures are never cached.
/// - Each resolution runs as its own task, so a caller that gives up does
///   not cancel it; the result still lands in the cache.
///
/// The state lock is held only for map operations, never across an await,
/// so lookups for different locators never wait on each other.
#[derive(Clone)]
pub struct MetadataCache {
    resolver: MetadataResolver,
    ttl: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl MetadataCache {
    pub fn new(resolver: MetadataResolver) -> Self {
        Self::with_ttl(resolver, DEFAULT_TTL)
    }

    pub fn with_ttl(resolver: MetadataResolver, ttl: Duration) -> Self {
        Self {
            resolver,
            ttl,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_or_resolve(&self, locator: &str) -> Resolution {
        let flight = {
            let mut state = lock(&self.state);

            match state.entries.get(locator) {
                Some(cached) if cached.expires_at > Instant::now() => {
                    tracing::debug!(locator = %locator, "Metadata cache hit");
                    return Ok(Arc::clone(&cached.record));
                }
                Some(_) => {
                    state.entries.remove(locator);
                }
                None => {}
            }

            if let Some(flight) = state.in_flight.get(locator) {
                tracing::debug!(locator = %locator, "Joining in-flight resolution");
                flight.clone()
            } else {
                tracing::debug!(locator = %locator, "Metadata cache miss");
                let flight = self.spawn_resolution(locator.to_string());
                state.in_flight.insert(locator.to_string(), flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Start resolving `locator` on its own task.
    ///
    /// Must be called with the state lock held: the task takes the same lock
    /// to publish its result, so it cannot finish before the caller has
    /// registered the returned future as in flight.
    fn spawn_resolution(&self, locator: String) -> InFlight {
        let resolver = self.resolver.clone();
        let state = Arc::clone(&self.state);
        let ttl = self.ttl;
        let task_locator = locator.clone();

        let handle = tokio::spawn(async move {
            let locator = task_locator;
            let result = resolver.resolve(&locator).await.map(Arc::new);

            let mut state = lock(&state);
            state.in_flight.remove(&locator);
            match &result {
                Ok(record) => {
                    state.entries.insert(
                        locator,
                        CachedRecord {
                            record: Arc::clone(record),
                            expires_at: Instant::now() + ttl,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(locator = %locator, error = %e, "Metadata resolution failed");
                }
            }
            result
        });

        let cleanup = Arc::clone(&self.state);
        async move {
            handle.await.unwrap_or_else(|join_err| {
                // The task died before it could unregister itself.
                lock(&cleanup).in_flight.remove(&locator);
                tracing::error!(locator = %locator, error = %join_err, "Metadata resolution task failed");
                Err(ResolveError::Aborted {
                    locator,
                    reason: join_err.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    // Map updates cannot be left half-done, so a poisoned lock is still usable.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use serde_json::json;

    fn item(title: &str) -> serde_json::Value {
        json!({"_type": "video", "title": title, "release_timestamp": 1_700_000_000})
    }

    fn cache_with(backend: &Arc<FakeBackend>, ttl: Duration) -> MetadataCache {
        MetadataCache::with_ttl(MetadataResolver::new(backend.clone()), ttl)
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let backend = Arc::new(FakeBackend::new().with_info("a", item("A")));
        let cache = cache_with(&backend, DEFAULT_TTL);

        let first = cache.get_or_resolve("a").await.unwrap();
        let second = cache.get_or_resolve("a").await.unwrap();

        assert_eq!(first.title, "A");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.calls("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lookups_share_one_resolution() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_info("a", item("A"))
                .with_delay("a", Duration::from_secs(2)),
        );
        let cache = cache_with(&backend, DEFAULT_TTL);

        let lookups = (0..10).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_resolve("a").await })
        });
        let results = futures::future::join_all(lookups).await;

        for result in results {
            assert_eq!(result.unwrap().unwrap().title, "A");
        }
        assert_eq!(backend.calls("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lookups_share_one_failure() {
        let backend = Arc::new(FakeBackend::new().with_delay("gone", Duration::from_secs(1)));
        let cache = cache_with(&backend, DEFAULT_TTL);

        let (a, b, c) = tokio::join!(
            cache.get_or_resolve("gone"),
            cache.get_or_resolve("gone"),
            cache.get_or_resolve("gone"),
        );

        for result in [a, b, c] {
            assert!(matches!(result, Err(ResolveError::Extraction { .. })));
        }
        assert_eq!(backend.calls("gone"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let backend = Arc::new(FakeBackend::new().with_info("a", item("A")));
        let cache = cache_with(&backend, DEFAULT_TTL);

        cache.get_or_resolve("a").await.unwrap();
        tokio::time::advance(DEFAULT_TTL - Duration::from_secs(1)).await;
        cache.get_or_resolve("a").await.unwrap();
        assert_eq!(backend.calls("a"), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        cache.get_or_resolve("a").await.unwrap();
        assert_eq!(backend.calls("a"), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let backend = Arc::new(FakeBackend::new());
        let cache = cache_with(&backend, DEFAULT_TTL);

        assert!(cache.get_or_resolve("gone").await.is_err());
        assert!(cache.get_or_resolve("gone").await.is_err());
        assert_eq!(backend.calls("gone"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_locator_does_not_block_others() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_info("slow", item("Slow"))
                .with_delay("slow", Duration::from_secs(60))
                .with_info("fast", item("Fast")),
        );
        let cache = cache_with(&backend, DEFAULT_TTL);

        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_resolve("slow").await })
        };
        tokio::task::yield_now().await;

        let fast = tokio::time::timeout(Duration::from_secs(1), cache.get_or_resolve("fast"))
            .await
            .expect("fast lookup must not wait for the slow one");
        assert_eq!(fast.unwrap().title, "Fast");
        assert!(!slow.is_finished());

        assert_eq!(slow.await.unwrap().unwrap().title, "Slow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_lookup_still_populates_cache() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_info("a", item("A"))
                .with_delay("a", Duration::from_secs(5)),
        );
        let cache = cache_with(&backend, DEFAULT_TTL);

        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), cache.get_or_resolve("a")).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(cache.get_or_resolve("a").await.unwrap().title, "A");
        assert_eq!(backend.calls("a"), 1);
    }
}
