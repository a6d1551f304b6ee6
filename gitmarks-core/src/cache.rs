//! Keyed async query cache.
//!
//! Each entry is fetched at most once at a time: concurrent callers for the
//! same key await the same in-flight fetch. Failed fetches leave no entry
//! behind, so the next caller retries. Entries are dropped by key, by
//! predicate, or when their staleness window passes, and may be patched with
//! a server-confirmed result without refetching.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;

/// Composite key identifying one cached resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    CurrentUser,
    ClassroomUser { classroom: i64 },
    ClassroomUsers { classroom: i64 },
    ClassroomRubrics { classroom: i64 },
    Installations,
    OrgClassrooms { org: i64 },
    Rubric { rubric: i64 },
    AssignmentRubric { classroom: i64, assignment: i64 },
    Works { classroom: i64, assignment: i64 },
    Work { classroom: i64, assignment: i64, work: i64 },
    WorkTree { classroom: i64, assignment: i64, work: i64 },
    Blob { classroom: i64, assignment: i64, work: i64, sha: String },
}

impl QueryKey {
    /// The student work this key belongs to, if any.
    pub fn work(&self) -> Option<i64> {
        match self {
            QueryKey::Work { work, .. } | QueryKey::WorkTree { work, .. } | QueryKey::Blob { work, .. } => {
                Some(*work)
            }
            _ => None,
        }
    }
}

/// When a cached value must be fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Staleness {
    /// Valid until explicitly invalidated.
    #[default]
    Never,
    After(Duration),
}

impl Staleness {
    fn is_stale(self, fetched_at: Instant) -> bool {
        match self {
            Staleness::Never => false,
            Staleness::After(ttl) => fetched_at.elapsed() >= ttl,
        }
    }
}

type Slot<V> = Arc<OnceCell<(V, Instant)>>;

/// Memoized async resources of one value type, keyed by [`QueryKey`].
#[derive(Debug)]
pub struct QueryCache<V> {
    slots: Mutex<HashMap<QueryKey, Slot<V>>>,
    staleness: Staleness,
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new(Staleness::Never)
    }
}

impl<V: Clone> QueryCache<V> {
    pub fn new(staleness: Staleness) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            staleness,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, Slot<V>>> {
        // A poisoned map is still structurally valid.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, key: &QueryKey) -> Slot<V> {
        let mut slots = self.lock();
        if let Some(slot) = slots.get(key) {
            let stale = slot.get().is_some_and(|(_, at)| self.staleness.is_stale(*at));
            if !stale {
                return Arc::clone(slot);
            }
            tracing::trace!(?key, "cache entry stale");
        }
        let slot: Slot<V> = Arc::new(OnceCell::new());
        slots.insert(key.clone(), Arc::clone(&slot));
        slot
    }

    /// Returns the cached value for `key`, running `fetch` if there is none.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error; nothing is cached in that case.
    pub async fn fetch<F, Fut, E>(&self, key: &QueryKey, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let (value, _) = slot
            .get_or_try_init(|| async {
                tracing::debug!(?key, "cache miss");
                fetch().await.map(|v| (v, Instant::now()))
            })
            .await?;
        Ok(value.clone())
    }

    /// The cached value for `key`, without fetching. Stale values are still
    /// returned.
    pub fn peek(&self, key: &QueryKey) -> Option<V> {
        self.lock().get(key).and_then(|slot| slot.get()).map(|(v, _)| v.clone())
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.lock().remove(key);
    }

    /// Drops every entry whose key matches `pred`.
    pub fn invalidate_where(&self, mut pred: impl FnMut(&QueryKey) -> bool) {
        self.lock().retain(|key, _| !pred(key));
    }

    /// Replaces a cached value with `f(current)`. Call only after the server
    /// confirmed the change. Returns false when nothing is cached under `key`.
    pub fn patch(&self, key: &QueryKey, f: impl FnOnce(&V) -> V) -> bool {
        let mut slots = self.lock();
        let Some((current, _)) = slots.get(key).and_then(|slot| slot.get()) else {
            return false;
        };
        let next = f(current);
        slots.insert(key.clone(), Arc::new(OnceCell::new_with(Some((next, Instant::now())))));
        true
    }

    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
