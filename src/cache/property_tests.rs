//! Property-Based Tests for the cache and limiter
//!
//! Uses proptest to check key determinism and injectivity, cache-aside
//! behavior over arbitrary values, and the sliding-window admission bound.

use proptest::prelude::*;
use std::sync::Arc;

use crate::cache::keys::{count_key, detail_key, list_key, sorted_list_key};
use crate::cache::{CacheOptions, CacheService};
use crate::catalog::{SortField, SortOrder};
use crate::clock::{Clock, ManualClock};
use crate::store::{KeyValueStore, MemoryStore, StoreClient};

// == Strategies ==
/// Category names, including ones with key separators and glob characters.
fn category_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z:%*?]{1,12}".prop_filter("'all' aliases no filter", |c| c != "all"))
}

fn sort_strategy() -> impl Strategy<Value = (SortField, SortOrder)> {
    (
        prop_oneof![
            Just(SortField::Price),
            Just(SortField::Name),
            Just(SortField::CreatedAt)
        ],
        prop_oneof![Just(SortOrder::Asc), Just(SortOrder::Desc)],
    )
}

fn memory_cache() -> CacheService {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
    let store = StoreClient::with_backend(Arc::new(MemoryStore::new(clock.clone())), clock);
    CacheService::with_defaults(Arc::new(store))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Same arguments, same key.
    #[test]
    fn prop_list_key_deterministic(
        page in 1u32..1000,
        limit in 1u32..=50,
        category in category_strategy(),
    ) {
        prop_assert_eq!(
            list_key(page, limit, category.as_deref()),
            list_key(page, limit, category.as_deref())
        );
    }

    // Distinct queries never share a key.
    #[test]
    fn prop_list_key_injective(
        a in (1u32..100, 1u32..=50, category_strategy(), sort_strategy()),
        b in (1u32..100, 1u32..=50, category_strategy(), sort_strategy()),
    ) {
        let key_a = sorted_list_key(a.0, a.1, a.2.as_deref(), a.3.0, a.3.1);
        let key_b = sorted_list_key(b.0, b.1, b.2.as_deref(), b.3.0, b.3.1);
        prop_assert_eq!(a == b, key_a == key_b);
    }

    #[test]
    fn prop_count_and_detail_keys_injective(x in "[a-z:%*]{1,8}", y in "[a-z:%*]{1,8}") {
        prop_assert_eq!(x == y, detail_key(&x) == detail_key(&y));
        let cx = Some(x.as_str()).filter(|c| *c != "all");
        let cy = Some(y.as_str()).filter(|c| *c != "all");
        prop_assert_eq!(cx == cy, count_key(cx) == count_key(cy));
    }

    // A second with_cache call for the same key is served from cache with the
    // first value.
    #[test]
    fn prop_with_cache_serves_first_value(key in "[a-z]{1,16}", first in any::<i64>(), second in any::<i64>()) {
        let cache = memory_cache();
        let opts = CacheOptions::ttl(60);

        let (a, b) = tokio_test::block_on(async {
            let a = cache.with_cache(&key, || async move { Ok::<_, ()>(first) }, &opts).await.unwrap();
            let b = cache.with_cache(&key, || async move { Ok::<_, ()>(second) }, &opts).await.unwrap();
            (a, b)
        });

        prop_assert!(!a.cached);
        prop_assert!(b.cached);
        prop_assert_eq!(b.data, first);
    }

    // Never more than `limit` admissions inside any trailing window.
    #[test]
    fn prop_sliding_window_bound(
        limit in 1u64..10,
        gaps in prop::collection::vec(0u64..400, 1..80),
    ) {
        let window_ms = 1_000;
        let store = MemoryStore::new(Arc::new(ManualClock::new(0)));

        let admitted: Vec<u64> = tokio_test::block_on(async {
            let mut now = 10_000;
            let mut admitted = Vec::new();
            for gap in gaps {
                now += gap;
                let hit = store.sliding_window("id", limit, window_ms, now).await.unwrap();
                if hit.admitted {
                    admitted.push(now);
                }
            }
            admitted
        });

        for (i, start) in admitted.iter().enumerate() {
            let inside = admitted[i..].iter().filter(|t| **t < start + window_ms).count();
            prop_assert!(inside as u64 <= limit, "{} admissions within one window", inside);
        }
    }
}
