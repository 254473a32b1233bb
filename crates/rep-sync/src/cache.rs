//! The Cache Layer: keyed, single-flight, invalidation-driven reads.
//!
//! Each key owns a slot holding the latest [`QueryState`] in a `watch`
//! channel. Every [`Query`] on that key is a receiver of the same channel, so
//! concurrent readers share one fetch and see its result together.
//!
//! A slot is refetched when:
//! - it is mounted for the first time, or remounted after being invalidated
//!   while nobody watched it (the stale value is shown meanwhile);
//! - it is invalidated while at least one query watches it.
//!
//! An invalidation that lands while a fetch is in flight marks the slot stale;
//! the in-flight result is then discarded and the slot fetched again, so a
//! value read before a mutation is never published after it.
//!
//! Slots nobody watches or fetches are idle. Idle slots holding nothing worth
//! showing (`NotFound`, or a failure with no earlier value) are dropped, and
//! only the [`MAX_IDLE_ENTRIES`] most recently mounted idle slots per table
//! are kept for remounts.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::future::BoxFuture;
use rep_model::{Workout, WorkoutId};
use rep_persistence::{BusSubscription, Scope};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::backend::WorkoutBackend;
use crate::error::Result;
use crate::query::{Query, QueryState};

/// Canonical identity of a cached read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    WorkoutList,
    Workout(WorkoutId),
}

impl QueryKey {
    /// Path-like segments; prefixes select families of keys.
    pub fn segments(&self) -> Vec<String> {
        match self {
            Self::WorkoutList => vec!["workouts".to_string()],
            Self::Workout(id) => vec!["workouts".to_string(), id.to_string()],
        }
    }
}

/// Selects cached keys for invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    Exact(QueryKey),
    /// Every key whose segments start with these.
    Prefix(Vec<String>),
}

impl KeyPattern {
    /// Every key the cache holds.
    pub fn everything() -> Self {
        Self::Prefix(Vec::new())
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::Exact(exact) => exact == key,
            Self::Prefix(prefix) => key.segments().starts_with(prefix),
        }
    }

    /// Keys a change of the given scope can affect.
    pub fn for_scope(scope: Scope) -> Vec<Self> {
        match scope {
            Scope::All => vec![Self::everything()],
            Scope::List => vec![Self::Exact(QueryKey::WorkoutList)],
            Scope::Workout(id) => vec![
                Self::Exact(QueryKey::Workout(id)),
                Self::Exact(QueryKey::WorkoutList),
            ],
        }
    }
}

/// Idle slots kept per table for remounts.
pub const MAX_IDLE_ENTRIES: usize = 64;

#[doc(hidden)]
pub struct Slot<T> {
    tx: watch::Sender<QueryState<T>>,
    fetching: bool,
    stale: bool,
    last_mounted: u64,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            tx: watch::Sender::new(QueryState::Loading),
            fetching: false,
            stale: true,
            last_mounted: 0,
        }
    }

    fn watched(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    fn idle(&self) -> bool {
        !self.watched() && !self.fetching
    }

    fn worth_keeping(&self) -> bool {
        !matches!(
            &*self.tx.borrow(),
            QueryState::Loading | QueryState::NotFound | QueryState::Failed { last: None, .. }
        )
    }
}

#[doc(hidden)]
#[derive(Default)]
pub struct Tables {
    lists: HashMap<(), Slot<Vec<Workout>>>,
    workouts: HashMap<WorkoutId, Slot<Workout>>,
    mounts: u64,
}

impl Tables {
    fn tick(&mut self) -> u64 {
        self.mounts += 1;
        self.mounts
    }
}

fn evict_idle<T: CachedValue>(tables: &mut Tables) {
    let table = T::table(tables);
    table.retain(|_, slot| !slot.idle() || slot.worth_keeping());

    let mut idle: Vec<(u64, T::Key)> = table
        .iter()
        .filter(|(_, slot)| slot.idle())
        .map(|(key, slot)| (slot.last_mounted, *key))
        .collect();
    if idle.len() > MAX_IDLE_ENTRIES {
        idle.sort_unstable_by_key(|(last_mounted, _)| *last_mounted);
        let excess = idle.len() - MAX_IDLE_ENTRIES;
        for (_, key) in &idle[..excess] {
            table.remove(key);
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for Vec<rep_model::Workout> {}
    impl Sealed for rep_model::Workout {}
}

/// A value the cache can hold.
pub trait CachedValue: sealed::Sealed + Sized + Send + Sync + 'static {
    #[doc(hidden)]
    type Key: Copy + Eq + Hash + Send + Sync + std::fmt::Debug + 'static;

    #[doc(hidden)]
    fn query_key(key: Self::Key) -> QueryKey;

    #[doc(hidden)]
    fn table(tables: &mut Tables) -> &mut HashMap<Self::Key, Slot<Self>>;

    #[doc(hidden)]
    fn fetch(backend: Arc<dyn WorkoutBackend>, key: Self::Key)
    -> BoxFuture<'static, Result<Option<Self>>>;
}

impl CachedValue for Vec<Workout> {
    type Key = ();

    fn query_key((): ()) -> QueryKey {
        QueryKey::WorkoutList
    }

    fn table(tables: &mut Tables) -> &mut HashMap<(), Slot<Self>> {
        &mut tables.lists
    }

    fn fetch(backend: Arc<dyn WorkoutBackend>, (): ()) -> BoxFuture<'static, Result<Option<Self>>> {
        Box::pin(async move { backend.list_workouts().await.map(Some) })
    }
}

impl CachedValue for Workout {
    type Key = WorkoutId;

    fn query_key(id: WorkoutId) -> QueryKey {
        QueryKey::Workout(id)
    }

    fn table(tables: &mut Tables) -> &mut HashMap<WorkoutId, Slot<Self>> {
        &mut tables.workouts
    }

    fn fetch(
        backend: Arc<dyn WorkoutBackend>,
        id: WorkoutId,
    ) -> BoxFuture<'static, Result<Option<Self>>> {
        Box::pin(async move { backend.get_workout(id).await })
    }
}

pub(crate) struct CacheInner {
    backend: Arc<dyn WorkoutBackend>,
    runtime: Handle,
    tables: Mutex<Tables>,
    /// Fetches in flight across all slots.
    pending: watch::Sender<usize>,
    _signals: BusSubscription,
}

impl CacheInner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn mount<T: CachedValue>(
        self: &Arc<Self>,
        key: T::Key,
    ) -> watch::Receiver<QueryState<T>> {
        let mut tables = self.tables();
        let now = tables.tick();
        let slot = T::table(&mut tables).entry(key).or_insert_with(Slot::new);
        slot.last_mounted = now;
        let rx = slot.tx.subscribe();
        if slot.stale && !slot.fetching {
            self.start_fetch(key, slot);
        } else {
            tracing::debug!(key = ?T::query_key(key), "Serving cached query");
        }
        rx
    }

    fn start_fetch<T: CachedValue>(self: &Arc<Self>, key: T::Key, slot: &mut Slot<T>) {
        slot.fetching = true;
        slot.stale = false;
        self.pending.send_modify(|n| *n += 1);
        tracing::debug!(key = ?T::query_key(key), "Fetching query");

        let inner = Arc::clone(self);
        let fetch = T::fetch(Arc::clone(&self.backend), key);
        self.runtime.spawn(async move {
            let result = fetch.await;
            inner.complete(key, result);
        });
    }

    fn complete<T: CachedValue>(self: &Arc<Self>, key: T::Key, result: Result<Option<T>>) {
        let mut tables = self.tables();
        if let Some(slot) = T::table(&mut tables).get_mut(&key) {
            slot.fetching = false;
            if slot.stale && slot.watched() {
                tracing::debug!(key = ?T::query_key(key), "Discarding superseded fetch");
                self.start_fetch(key, slot);
            } else {
                let next = match result {
                    Ok(Some(value)) => QueryState::Ready(Arc::new(value)),
                    Ok(None) => QueryState::NotFound,
                    Err(error) => {
                        tracing::warn!(key = ?T::query_key(key), %error, "Query failed");
                        slot.stale = true;
                        QueryState::Failed {
                            error,
                            last: slot.tx.borrow().value().cloned(),
                        }
                    }
                };
                slot.tx.send_replace(next);
            }
        }
        evict_idle::<T>(&mut tables);
        drop(tables);
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    fn invalidate_table<T: CachedValue>(
        self: &Arc<Self>,
        tables: &mut Tables,
        pattern: &KeyPattern,
    ) -> usize {
        let mut refetched = 0;
        for (key, slot) in T::table(tables).iter_mut() {
            if !pattern.matches(&T::query_key(*key)) {
                continue;
            }
            slot.stale = true;
            if slot.watched() && !slot.fetching {
                self.start_fetch(*key, slot);
                refetched += 1;
            }
        }
        evict_idle::<T>(tables);
        refetched
    }

    fn invalidate(self: &Arc<Self>, pattern: &KeyPattern) -> usize {
        let mut tables = self.tables();
        self.invalidate_table::<Vec<Workout>>(&mut tables, pattern)
            + self.invalidate_table::<Workout>(&mut tables, pattern)
    }
}

/// Keyed cache of workout reads, refreshed by invalidation signals.
///
/// Clones share one cache. The cache listens on the backend's bus for as long
/// as any clone or query is alive.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    /// Fetches run on `runtime`.
    pub fn new(backend: Arc<dyn WorkoutBackend>, runtime: Handle) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<CacheInner>| {
            let weak = weak.clone();
            let signals = backend.bus().subscribe(move |scope| {
                if let Some(inner) = weak.upgrade() {
                    for pattern in KeyPattern::for_scope(*scope) {
                        inner.invalidate(&pattern);
                    }
                }
            });
            CacheInner {
                backend,
                runtime,
                tables: Mutex::new(Tables::default()),
                pending: watch::Sender::new(0),
                _signals: signals,
            }
        });
        Self { inner }
    }

    pub fn watch_workouts(&self) -> Query<Vec<Workout>> {
        Query::mount(Arc::clone(&self.inner), ())
    }

    pub fn watch_workout(&self, id: WorkoutId) -> Query<Workout> {
        Query::mount(Arc::clone(&self.inner), id)
    }

    /// Marks matching entries stale and refetches those being watched.
    /// Returns the number of refetches started; does not wait for them.
    pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
        self.inner.invalidate(pattern)
    }

    /// Waits until no fetch is in flight.
    pub async fn settle(&self) {
        let mut pending = self.inner.pending.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = pending.wait_for(|n| *n == 0).await;
    }
}
