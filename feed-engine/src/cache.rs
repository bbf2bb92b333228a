//! Sponsor delta cache
//!
//! Session-lifetime `id -> sponsor` map. `ensure` fetches only the ids the
//! cache does not hold yet, tolerates individual failures and merges the
//! successes as an idempotent union: entries are never overwritten, never
//! refreshed, never evicted. Failed ids are not remembered as failures and
//! are simply fetched again by the next `ensure` that asks for them.
//!
//! One cache is constructed per session and shared by `Arc`.

use feed_core::{EntityMap, Id, SecondaryEntity};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use crate::error::{EntityFailure, PartialEntityError};
use crate::source::EntitySource;

/// Outcome of one `ensure` round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillReport {
    /// Distinct ids asked for
    pub requested: usize,
    /// Ids already present before the round
    pub already_cached: usize,
    /// Ids resolved by this round
    pub fetched: Vec<Id>,
    /// Ids left unresolved, eligible for retry
    pub failed: Vec<PartialEntityError>,
}

impl FillReport {
    /// True when every requested id is now cached.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// True when the round needed no network at all.
    pub fn was_cache_hit(&self) -> bool {
        self.requested == self.already_cached
    }
}

pub struct EntityDeltaCache {
    source: Arc<dyn EntitySource>,
    entities: RwLock<EntityMap>,
}

impl EntityDeltaCache {
    pub fn new(source: Arc<dyn EntitySource>) -> Self {
        Self {
            source,
            entities: RwLock::new(EntityMap::new()),
        }
    }

    /// Make sure every id in `ids` is cached, fetching only the missing ones.
    ///
    /// Never fails as a whole; per-id failures are reported in the
    /// [`FillReport`] and logged.
    pub async fn ensure<I>(&self, ids: I) -> FillReport
    where
        I: IntoIterator<Item = Id>,
    {
        let requested: BTreeSet<Id> = ids.into_iter().collect();

        let missing: Vec<Id> = {
            let entities = self.entities.read().await;
            requested
                .iter()
                .filter(|id| !entities.contains_key(*id))
                .cloned()
                .collect()
        };

        let mut report = FillReport {
            requested: requested.len(),
            already_cached: requested.len() - missing.len(),
            ..Default::default()
        };

        if missing.is_empty() {
            debug!(requested = report.requested, "Sponsor cache hit");
            return report;
        }

        debug!(
            missing = missing.len(),
            cached = report.already_cached,
            "Fetching missing sponsors"
        );

        let (found, mut failed) = if self.source.supports_batch() {
            self.fetch_batch(&missing).await
        } else {
            self.fetch_each(&missing).await
        };

        {
            let mut entities = self.entities.write().await;
            for entity in found {
                entities
                    .entry(entity.id.clone())
                    .or_insert_with(|| Arc::new(entity));
            }

            for id in missing {
                if entities.contains_key(&id) {
                    report.fetched.push(id);
                } else if !failed.iter().any(|f| f.id == id) {
                    failed.push(PartialEntityError::new(id, EntityFailure::Absent));
                }
            }
        }

        for failure in &failed {
            warn!(id = %failure.id, reason = %failure.reason, "Sponsor unresolved this round");
        }
        report.failed = failed;
        report
    }

    /// One request per id, all in flight at once.
    async fn fetch_each(&self, ids: &[Id]) -> (Vec<SecondaryEntity>, Vec<PartialEntityError>) {
        let results = join_all(ids.iter().map(|id| self.source.fetch_entity(id))).await;

        let mut found = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        for result in results {
            match result {
                Ok(entity) => found.push(entity),
                Err(e) => failed.push(e),
            }
        }
        (found, failed)
    }

    /// One batch request; a failed batch falls back to single fetches.
    async fn fetch_batch(&self, ids: &[Id]) -> (Vec<SecondaryEntity>, Vec<PartialEntityError>) {
        match self.source.fetch_batch(ids).await {
            Ok(found) => (found, Vec::new()),
            Err(e) => {
                warn!(error = %e, count = ids.len(), "Batch sponsor fetch failed, falling back to single fetches");
                self.fetch_each(ids).await
            }
        }
    }

    pub async fn get(&self, id: &Id) -> Option<Arc<SecondaryEntity>> {
        self.entities.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &Id) -> bool {
        self.entities.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }

    /// Borrow the current contents without copying. Fills wait until the
    /// guard is dropped, so hold it only for synchronous work.
    pub async fn read(&self) -> RwLockReadGuard<'_, EntityMap> {
        self.entities.read().await
    }

    /// Immutable point-in-time copy of the current contents.
    pub async fn snapshot(&self) -> EntityMap {
        self.entities.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockEntitySource;
    use std::time::Duration;

    fn ids(list: &[&str]) -> Vec<Id> {
        list.iter().map(|s| Id::from(*s)).collect()
    }

    fn acme() -> SecondaryEntity {
        SecondaryEntity::new("a", "Acme").with_logo("https://cdn.example.com/acme.png")
    }

    #[tokio::test]
    async fn test_second_ensure_is_free() {
        let source = Arc::new(MockEntitySource::new().with_entity(acme()));
        let cache = EntityDeltaCache::new(source.clone());

        let first = cache.ensure(ids(&["a"])).await;
        assert_eq!(first.fetched, ids(&["a"]));
        assert_eq!(source.call_count(), 1);

        let second = cache.ensure(ids(&["a"])).await;
        assert!(second.was_cache_hit());
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_then_delta() {
        let source = Arc::new(
            MockEntitySource::new()
                .with_entity(acme())
                .with_entity(SecondaryEntity::new("b", "Bolt"))
                .with_entity(SecondaryEntity::new("c", "Crane"))
                .with_failure("b", EntityFailure::Status(404)),
        );
        let cache = EntityDeltaCache::new(source.clone());

        let report = cache.ensure(ids(&["a", "b"])).await;
        assert_eq!(report.fetched, ids(&["a"]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, Id::from("b"));
        assert_eq!(cache.len().await, 1);
        assert!(cache.contains(&Id::from("a")).await);

        source.reset_calls();
        let report = cache.ensure(ids(&["a", "b", "c"])).await;

        let mut asked = source.requested_ids();
        asked.sort();
        assert_eq!(asked, ids(&["b", "c"]));
        assert_eq!(report.already_cached, 1);
        assert_eq!(report.fetched, ids(&["c"]));
    }

    #[tokio::test]
    async fn test_duplicate_ids_fetched_once() {
        let source = Arc::new(MockEntitySource::new().with_entity(acme()));
        let cache = EntityDeltaCache::new(source.clone());

        let report = cache.ensure(ids(&["a", "a", "a"])).await;
        assert_eq!(report.requested, 1);
        assert_eq!(source.requested_ids(), ids(&["a"]));
    }

    #[tokio::test]
    async fn test_empty_ensure_makes_no_calls() {
        let source = Arc::new(MockEntitySource::new());
        let cache = EntityDeltaCache::new(source.clone());

        let report = cache.ensure(Vec::new()).await;
        assert!(report.is_complete());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_fetches_run_in_parallel() {
        let source = Arc::new(
            MockEntitySource::new()
                .with_entity(SecondaryEntity::new("a", "Acme"))
                .with_entity(SecondaryEntity::new("b", "Bolt"))
                .with_delay("a", Duration::from_millis(300))
                .with_delay("b", Duration::from_millis(300)),
        );
        let cache = EntityDeltaCache::new(source);

        let started = tokio::time::Instant::now();
        let report = cache.ensure(ids(&["a", "b"])).await;

        assert!(report.is_complete());
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_batch_used_when_supported() {
        let source = Arc::new(
            MockEntitySource::new()
                .with_batch()
                .with_entity(acme())
                .with_entity(SecondaryEntity::new("b", "Bolt")),
        );
        let cache = EntityDeltaCache::new(source.clone());

        let report = cache.ensure(ids(&["a", "b", "x"])).await;

        assert_eq!(source.batch_requests(), vec![ids(&["a", "b", "x"])]);
        assert!(source.requested_ids().is_empty());
        assert_eq!(report.fetched, ids(&["a", "b"]));
        assert_eq!(report.failed, vec![PartialEntityError::new(Id::from("x"), EntityFailure::Absent)]);
    }

    #[tokio::test]
    async fn test_failed_batch_falls_back() {
        let source = Arc::new(
            MockEntitySource::new()
                .with_failing_batch(EntityFailure::Status(500))
                .with_entity(acme()),
        );
        let cache = EntityDeltaCache::new(source.clone());

        let report = cache.ensure(ids(&["a"])).await;

        assert_eq!(source.batch_requests().len(), 1);
        assert_eq!(source.requested_ids(), ids(&["a"]));
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_existing_entries_never_overwritten() {
        let first = Arc::new(MockEntitySource::new().with_entity(acme()));
        let cache = EntityDeltaCache::new(first);
        cache.ensure(ids(&["a"])).await;

        let before = cache.get(&Id::from("a")).await.unwrap();
        cache.ensure(ids(&["a"])).await;
        let after = cache.get(&Id::from("a")).await.unwrap();

        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(cache.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_read_borrows_without_copying() {
        let source = Arc::new(MockEntitySource::new().with_entity(acme()));
        let cache = EntityDeltaCache::new(source);
        cache.ensure(ids(&["a"])).await;

        {
            let entities = cache.read().await;
            // only the map itself holds the entry
            assert_eq!(Arc::strong_count(&entities[&Id::from("a")]), 1);
        }

        let snapshot = cache.snapshot().await;
        assert_eq!(Arc::strong_count(&snapshot[&Id::from("a")]), 2);

        // a fill after the guard is dropped is not blocked
        drop(snapshot);
        assert!(cache.ensure(ids(&["a"])).await.was_cache_hit());
    }
}
