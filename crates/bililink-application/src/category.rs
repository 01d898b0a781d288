//! Category taxonomy service.
//!
//! A read-through cache over the platform's two-level area list, plus
//! the selection memory used to pre-populate the pickers. The cache is
//! consulted independently of the session lifecycle; the controller
//! only ever reads the already-selected category id.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use bililink_core::error::Result;
use bililink_core::store::SessionStore;
use bililink_core::taxonomy::{CachedTaxonomy, Selection, Taxonomy, TaxonomyFetcher};

/// Serves the taxonomy from the persisted cache while it is younger
/// than the 24-hour window, refetching otherwise.
pub struct CategoryService {
    fetcher: Arc<dyn TaxonomyFetcher>,
    store: SessionStore,
}

impl CategoryService {
    pub fn new(fetcher: Arc<dyn TaxonomyFetcher>, store: SessionStore) -> Self {
        Self { fetcher, store }
    }

    /// Returns the taxonomy, fetching it when the cache is absent or
    /// expired.
    ///
    /// On a successful fetch the cache and its timestamp are replaced
    /// in a single write. On failure the cache is left untouched and
    /// `TaxonomyUnavailable` is returned; offering a retry trigger is
    /// the caller's responsibility.
    pub async fn get_taxonomy(&self) -> Result<Taxonomy> {
        let now_ms = Utc::now().timestamp_millis();

        match self.store.load_taxonomy_cache().await {
            Ok(Some(cached)) if cached.is_fresh(now_ms) => {
                debug!("serving taxonomy from cache");
                return Ok(cached.into_taxonomy());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "taxonomy cache unreadable, refetching"),
        }

        let taxonomy = self.fetcher.fetch_taxonomy().await?;

        let cached = CachedTaxonomy::new(taxonomy.clone(), now_ms);
        if let Err(e) = self.store.save_taxonomy_cache(&cached).await {
            // Serving the fetched list still works; only the cache is lost.
            warn!(error = %e, "failed to persist taxonomy cache");
        }

        Ok(taxonomy)
    }

    /// Restores the remembered group/area selection against a freshly
    /// loaded taxonomy, falling back to the first entries.
    pub async fn restore_selection(&self, taxonomy: &Taxonomy) -> Option<Selection> {
        let group_id = self.store.last_group_id().await.ok().flatten();
        let area_id = self.store.last_area_id().await.ok().flatten();
        taxonomy.restore_selection(group_id.as_deref(), area_id.as_deref())
    }

    /// Records a group change from the adapter.
    pub async fn group_changed(&self, group_id: &str) -> Result<()> {
        self.store.set_last_group_id(group_id).await
    }

    /// Records an area change; the group is saved alongside so the pair
    /// restores consistently.
    pub async fn area_changed(&self, group_id: &str, area_id: &str) -> Result<()> {
        self.store.set_last_group_id(group_id).await?;
        self.store.set_last_area_id(area_id).await
    }

    /// Records the room id typed by the user.
    pub async fn room_changed(&self, room_id: &str) -> Result<()> {
        self.store.set_last_room_id(room_id).await
    }

    /// Records the broadcast title typed by the user.
    pub async fn title_changed(&self, title: &str) -> Result<()> {
        self.store.set_last_title(title).await
    }

    /// Remembered room id and title for pre-populating inputs.
    ///
    /// Advisory only; a live session's own persisted fields take
    /// precedence in the adapter.
    pub async fn remembered_inputs(&self) -> (Option<String>, Option<String>) {
        let room_id = self.store.last_room_id().await.ok().flatten();
        let title = self.store.last_title().await.ok().flatten();
        (room_id, title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bililink_core::LinkError;
    use bililink_core::taxonomy::{Area, AreaGroup};
    use bililink_infrastructure::MemoryKeyValueStore;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeFetcher {
        reply: StdMutex<Result<Taxonomy>>,
        fetches: AtomicUsize,
    }

    impl FakeFetcher {
        fn with(reply: Result<Taxonomy>) -> Arc<Self> {
            Arc::new(Self {
                reply: StdMutex::new(reply),
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaxonomyFetcher for FakeFetcher {
        async fn fetch_taxonomy(&self) -> Result<Taxonomy> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.reply.lock().unwrap().clone()
        }
    }

    fn sample() -> Taxonomy {
        Taxonomy::new(vec![AreaGroup {
            id: "2".to_string(),
            name: "Games".to_string(),
            areas: vec![Area {
                id: "86".to_string(),
                name: "League".to_string(),
            }],
        }])
    }

    fn memory_store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[tokio::test]
    async fn test_fresh_cache_is_reused_without_fetch() {
        let store = memory_store();
        let now = Utc::now().timestamp_millis();
        store
            .save_taxonomy_cache(&CachedTaxonomy::new(sample(), now - 23 * HOUR_MS))
            .await
            .unwrap();

        let fetcher = FakeFetcher::with(Ok(sample()));
        let service = CategoryService::new(fetcher.clone(), store);

        let taxonomy = service.get_taxonomy().await.unwrap();
        assert_eq!(taxonomy, sample());
        assert_eq!(fetcher.fetches(), 0);
    }

    #[tokio::test]
    async fn test_expired_cache_triggers_fetch_and_replace() {
        let store = memory_store();
        let now = Utc::now().timestamp_millis();
        store
            .save_taxonomy_cache(&CachedTaxonomy::new(Taxonomy::default(), now - 25 * HOUR_MS))
            .await
            .unwrap();

        let fetcher = FakeFetcher::with(Ok(sample()));
        let service = CategoryService::new(fetcher.clone(), store.clone());

        let taxonomy = service.get_taxonomy().await.unwrap();
        assert_eq!(taxonomy, sample());
        assert_eq!(fetcher.fetches(), 1);

        // The cache was replaced wholesale with a fresh timestamp.
        let cached = store.load_taxonomy_cache().await.unwrap().unwrap();
        assert_eq!(cached.groups, sample().groups);
        assert!(cached.is_fresh(Utc::now().timestamp_millis()));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cache_untouched() {
        let store = memory_store();
        let now = Utc::now().timestamp_millis();
        let stale = CachedTaxonomy::new(sample(), now - 25 * HOUR_MS);
        store.save_taxonomy_cache(&stale).await.unwrap();

        let fetcher = FakeFetcher::with(Err(LinkError::taxonomy_unavailable("boom")));
        let service = CategoryService::new(fetcher, store.clone());

        let err = service.get_taxonomy().await.unwrap_err();
        assert!(matches!(err, LinkError::TaxonomyUnavailable(_)));
        assert_eq!(store.load_taxonomy_cache().await.unwrap().unwrap(), stale);
    }

    #[tokio::test]
    async fn test_manual_retry_after_failure() {
        let fetcher = FakeFetcher::with(Err(LinkError::taxonomy_unavailable("boom")));
        let service = CategoryService::new(fetcher.clone(), memory_store());

        assert!(service.get_taxonomy().await.is_err());

        *fetcher.reply.lock().unwrap() = Ok(sample());
        assert_eq!(service.get_taxonomy().await.unwrap(), sample());
        assert_eq!(fetcher.fetches(), 2);
    }

    #[tokio::test]
    async fn test_selection_memory_round_trip() {
        let service = CategoryService::new(FakeFetcher::with(Ok(sample())), memory_store());

        service.area_changed("2", "86").await.unwrap();
        let selection = service.restore_selection(&sample()).await.unwrap();
        assert_eq!(selection.group_id, "2");
        assert_eq!(selection.area_id, "86");

        service.room_changed("123").await.unwrap();
        service.title_changed("Test").await.unwrap();
        let (room_id, title) = service.remembered_inputs().await;
        assert_eq!(room_id.as_deref(), Some("123"));
        assert_eq!(title.as_deref(), Some("Test"));
    }

    #[tokio::test]
    async fn test_stale_remembered_selection_falls_back() {
        let service = CategoryService::new(FakeFetcher::with(Ok(sample())), memory_store());
        service.area_changed("9", "999").await.unwrap();

        let selection = service.restore_selection(&sample()).await.unwrap();
        assert_eq!(selection.group_id, "2");
        assert_eq!(selection.area_id, "86");
    }
}
