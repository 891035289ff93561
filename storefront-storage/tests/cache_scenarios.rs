//! End-to-end behaviour of the cache layer against a counting origin.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storefront_core::EntityType;
use storefront_storage::cache::{
    CacheError, CacheLayer, CachePolicy, FilterSet, InMemoryCacheStore, KeyComposer,
    MutationKind,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
    id: String,
    category_id: String,
    price: u64,
}

#[derive(Debug)]
enum OriginError {
    Cache(CacheError),
}

impl From<CacheError> for OriginError {
    fn from(e: CacheError) -> Self {
        OriginError::Cache(e)
    }
}

/// A product table that counts loader calls.
#[derive(Default)]
struct Origin {
    products: Mutex<HashMap<String, Product>>,
    calls: AtomicUsize,
}

impl Origin {
    fn put(&self, id: &str, category_id: &str, price: u64) {
        self.products.lock().unwrap().insert(
            id.to_string(),
            Product {
                id: id.to_string(),
                category_id: category_id.to_string(),
                price,
            },
        );
    }

    async fn get(&self, id: &str) -> Result<Option<Product>, OriginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.lock().unwrap().get(id).cloned())
    }

    async fn by_category(&self, category_id: &str) -> Result<Vec<Product>, OriginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut found: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn layer() -> (CacheLayer<InMemoryCacheStore>, Arc<InMemoryCacheStore>) {
    let store = Arc::new(InMemoryCacheStore::new());
    (
        CacheLayer::new(Arc::clone(&store), CachePolicy::default()),
        store,
    )
}

#[tokio::test]
async fn scenario_a_repeat_read_hits_cache() {
    let (cache, _store) = layer();
    let origin = Origin::default();
    origin.put("p1", "c1", 10);

    let first = cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.value().price, 10);
    assert_eq!(origin.calls(), 1);

    let second = cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.into_value(), first.into_value());
    assert_eq!(origin.calls(), 1);
}

#[tokio::test]
async fn scenario_b_mutation_forces_reload() {
    let (cache, _store) = layer();
    let origin = Origin::default();
    origin.put("p1", "c1", 10);

    cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap();

    origin.put("p1", "c1", 20);
    cache
        .invalidator()
        .on_mutated(EntityType::Product, "p1", MutationKind::Updated)
        .await;

    let reread = cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap()
        .unwrap();
    assert!(reread.was_cache_miss());
    assert_eq!(reread.value().price, 20);
    assert_eq!(origin.calls(), 2);
}

#[tokio::test]
async fn scenario_c_any_product_write_purges_collections() {
    let (cache, store) = layer();
    let origin = Origin::default();
    origin.put("p1", "c1", 10);
    origin.put("p2", "c2", 5);

    let filter = FilterSet::new().text("categoryId", Some("c1"));
    cache
        .reader()
        .read_collection(EntityType::Product, &filter, || origin.by_category("c1"))
        .await
        .unwrap();
    let list_key = KeyComposer::collection(EntityType::Product, &filter).unwrap();
    assert!(store.contains(&list_key));

    // p2 is not in category c1, and was never read.
    cache
        .invalidator()
        .on_mutated(EntityType::Product, "p2", MutationKind::Updated)
        .await;
    assert!(!store.contains(&list_key));

    let reread = cache
        .reader()
        .read_collection(EntityType::Product, &filter, || origin.by_category("c1"))
        .await
        .unwrap();
    assert!(reread.was_cache_miss());
    assert_eq!(origin.calls(), 2);
}

#[tokio::test]
async fn creation_purges_collections_but_keeps_singles() {
    let (cache, store) = layer();
    let origin = Origin::default();
    origin.put("p1", "c1", 10);

    cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap();
    cache
        .reader()
        .read_collection(EntityType::Product, &FilterSet::new(), || {
            origin.by_category("c1")
        })
        .await
        .unwrap();

    origin.put("p3", "c1", 7);
    let report = cache
        .invalidator()
        .on_mutated(EntityType::Product, "p3", MutationKind::Created)
        .await;
    assert_eq!(report.keys_purged, 1);
    assert!(store.contains(&KeyComposer::single(EntityType::Product, "p1").unwrap()));
}

#[tokio::test]
async fn other_entity_types_are_untouched() {
    let (cache, store) = layer();
    let origin = Origin::default();
    origin.put("p1", "c1", 10);

    cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap();
    cache
        .invalidator()
        .on_mutated(EntityType::Category, "c1", MutationKind::Deleted)
        .await;
    assert_eq!(store.keys().len(), 1);
}

#[tokio::test]
async fn invalidation_with_backend_down_then_recovers() {
    let (cache, store) = layer();
    let origin = Origin::default();
    origin.put("p1", "c1", 10);

    cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap();

    store.set_offline(true);
    origin.put("p1", "c1", 20);
    let report = cache
        .invalidator()
        .on_mutated(EntityType::Product, "p1", MutationKind::Updated)
        .await;
    assert!(!report.backend_ok);

    // Reads keep working against the origin while the backend is down.
    let degraded = cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(degraded.value().price, 20);
    assert!(degraded.was_cache_miss());
}

#[tokio::test(start_paused = true)]
async fn entries_expire_after_ttl() {
    let store = Arc::new(InMemoryCacheStore::new());
    let cache = CacheLayer::new(
        Arc::clone(&store),
        CachePolicy::default().with_default_ttl(storefront_storage::TtlPolicy::new(
            Duration::from_secs(30),
            Duration::from_secs(60),
        )),
    );
    let origin = Origin::default();
    origin.put("p1", "c1", 10);

    for _ in 0..2 {
        cache
            .reader()
            .read_single(EntityType::Product, "p1", || origin.get("p1"))
            .await
            .unwrap();
    }
    assert_eq!(origin.calls(), 1);

    tokio::time::advance(Duration::from_secs(31)).await;
    cache
        .reader()
        .read_single(EntityType::Product, "p1", || origin.get("p1"))
        .await
        .unwrap();
    assert_eq!(origin.calls(), 2);
}

/// Writers bump a version and invalidate; readers race them. Once the
/// writers are done, a read must observe the final version, and every
/// cached key must be tracked by the index.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_never_resurrect_stale_values() {
    let (cache, store) = layer();
    let cache = Arc::new(cache);
    let version = Arc::new(AtomicU64::new(0));

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let cache = Arc::clone(&cache);
        let version = Arc::clone(&version);
        tasks.push(tokio::spawn(async move {
            for _ in 0..200 {
                let version = Arc::clone(&version);
                cache
                    .reader()
                    .read_single(EntityType::Product, "p1", move || async move {
                        let seen = version.load(Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, OriginError>(Some(seen))
                    })
                    .await
                    .unwrap();
            }
        }));
    }
    for _ in 0..2 {
        let cache = Arc::clone(&cache);
        let version = Arc::clone(&version);
        tasks.push(tokio::spawn(async move {
            for _ in 0..200 {
                version.fetch_add(1, Ordering::SeqCst);
                cache
                    .invalidator()
                    .on_mutated(EntityType::Product, "p1", MutationKind::Updated)
                    .await;
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for key in store.keys() {
        for tag in key.dependencies() {
            assert!(cache.index().contains(&tag, &key), "untracked key {}", key);
        }
    }

    let final_version = version.load(Ordering::SeqCst);
    // A hit must carry the final version; a miss loads it.
    let read = cache
        .reader()
        .read_single(EntityType::Product, "p1", move || async move {
            Ok::<_, OriginError>(Some(final_version))
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.into_value(), final_version);
}
