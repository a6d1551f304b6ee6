//! Query cache: de-duplication, invalidation, staleness and patching.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gitmarks_core::cache::{QueryCache, QueryKey, Staleness};

fn work_key(work: i64) -> QueryKey {
    QueryKey::Work {
        classroom: 1,
        assignment: 2,
        work,
    }
}

#[tokio::test]
async fn concurrent_fetches_share_one_request() {
    let cache: Arc<QueryCache<String>> = Arc::new(QueryCache::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            cache
                .fetch(&work_key(3), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, String>("work 3".to_owned())
                })
                .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "work 3");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let cache: QueryCache<u32> = QueryCache::default();
    let key = QueryKey::CurrentUser;

    let err = cache.fetch(&key, || async { Err::<u32, _>("offline") }).await;
    assert_eq!(err, Err("offline"));
    assert!(cache.peek(&key).is_none());

    let ok = cache.fetch(&key, || async { Ok::<_, &str>(7) }).await;
    assert_eq!(ok, Ok(7));
}

#[tokio::test]
async fn invalidation_by_key_and_predicate() {
    let cache: QueryCache<i64> = QueryCache::default();
    for work in [3, 4] {
        cache.fetch(&work_key(work), || async move { Ok::<_, ()>(work) }).await.unwrap();
    }
    let blob = QueryKey::Blob {
        classroom: 1,
        assignment: 2,
        work: 3,
        sha: "abc".into(),
    };
    cache.fetch(&blob, || async { Ok::<_, ()>(99) }).await.unwrap();
    assert_eq!(cache.len(), 3);

    cache.invalidate(&work_key(4));
    assert!(cache.peek(&work_key(4)).is_none());

    cache.invalidate_where(|key| key.work() == Some(3));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn stale_entries_are_refetched() {
    let cache: QueryCache<u32> = QueryCache::new(Staleness::After(Duration::from_millis(10)));
    let key = QueryKey::CurrentUser;

    cache.fetch(&key, || async { Ok::<_, ()>(1) }).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let v = cache.fetch(&key, || async { Ok::<_, ()>(2) }).await.unwrap();
    assert_eq!(v, 2);
}

#[tokio::test]
async fn patch_replaces_cached_value_only_when_present() {
    let cache: QueryCache<Vec<&str>> = QueryCache::default();
    let key = QueryKey::ClassroomUsers { classroom: 1 };

    assert!(!cache.patch(&key, |v| v.clone()));

    cache.fetch(&key, || async { Ok::<_, ()>(vec!["ada", "lin"]) }).await.unwrap();
    assert!(cache.patch(&key, |users| users.iter().copied().filter(|u| *u != "lin").collect()));
    assert_eq!(cache.peek(&key), Some(vec!["ada"]));

    let v = cache.fetch(&key, || async { Ok::<_, ()>(vec![]) }).await.unwrap();
    assert_eq!(v, vec!["ada"]);
}

#[tokio::test]
async fn default_cache_keeps_entries_until_invalidated() {
    let cache: QueryCache<String> = QueryCache::default();
    cache.fetch(&work_key(5), || async { Ok::<_, String>("first".to_owned()) }).await.unwrap();
    let again = cache
        .fetch(&work_key(5), || async { Ok::<_, String>("second".to_owned()) })
        .await
        .unwrap();
    assert_eq!(again, "first");
}
