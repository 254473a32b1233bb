//! Read Subscriptions: live views over cached reads.

use std::sync::Arc;

use rep_model::{Workout, WorkoutId};
use tokio::sync::watch;

use crate::cache::{CacheInner, CachedValue, QueryKey};
use crate::error::{Result, SyncError};

/// Observable state of a read.
#[derive(Debug)]
pub enum QueryState<T> {
    /// No value has been fetched yet.
    Loading,
    Ready(Arc<T>),
    /// The looked-up workout does not exist. Distinct from `Loading`.
    NotFound,
    /// The latest fetch failed. `last` keeps the previous value, if any, so
    /// views can keep showing it next to the error.
    Failed {
        error: SyncError,
        last: Option<Arc<T>>,
    },
}

// Values are shared behind `Arc`, so cloning never needs `T: Clone`.
impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Loading => Self::Loading,
            Self::Ready(value) => Self::Ready(Arc::clone(value)),
            Self::NotFound => Self::NotFound,
            Self::Failed { error, last } => Self::Failed {
                error: error.clone(),
                last: last.clone(),
            },
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The freshest value available, including one kept across a failure.
    pub fn value(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Failed { last, .. } => last.as_ref(),
            Self::Loading | Self::NotFound => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// A mounted read. Dropping it unsubscribes; a fetch already running still
/// completes and updates the cache, but nothing is delivered to this query.
pub struct Query<T: CachedValue> {
    inner: Arc<CacheInner>,
    key: T::Key,
    rx: watch::Receiver<QueryState<T>>,
}

impl<T: CachedValue> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query").field("key", &self.key()).finish()
    }
}

impl<T: CachedValue> Query<T> {
    pub(crate) fn mount(inner: Arc<CacheInner>, key: T::Key) -> Self {
        let rx = inner.mount::<T>(key);
        Self { inner, key, rx }
    }

    pub fn key(&self) -> QueryKey {
        T::query_key(self.key)
    }

    /// Current state, without waiting.
    pub fn state(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the next state change and returns the new state.
    pub async fn changed(&mut self) -> Result<QueryState<T>> {
        self.rx.changed().await.map_err(|_| SyncError::Cancelled)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Waits until the query has left `Loading`.
    pub async fn ready(&mut self) -> Result<QueryState<T>> {
        let state = self
            .rx
            .wait_for(|state| !state.is_loading())
            .await
            .map_err(|_| SyncError::Cancelled)?;
        Ok(state.clone())
    }

    /// Points the query at a different key, re-running the lookup.
    pub fn retarget_to(&mut self, key: T::Key) {
        if key != self.key {
            self.rx = self.inner.mount::<T>(key);
            self.key = key;
        }
    }
}

impl Query<Workout> {
    pub fn workout_id(&self) -> WorkoutId {
        self.key
    }

    /// Follows a different workout id.
    pub fn retarget(&mut self, id: WorkoutId) {
        self.retarget_to(id);
    }
}
