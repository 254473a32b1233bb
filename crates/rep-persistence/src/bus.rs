//! Process-wide invalidation signals.
//!
//! Writers publish a [`Scope`] after every committed change; readers
//! subscribe and decide for themselves what to re-derive. Handlers run
//! synchronously on the publishing thread, in registration order, and a
//! panicking handler is logged and skipped so later handlers still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rep_model::WorkoutId;

/// What a signal may have affected.
///
/// Every scope touches the workout list: a change anywhere in a workout can
/// alter its row in a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Anything may have changed.
    All,
    /// Workouts were added or removed.
    List,
    /// The named workout or something nested in it changed.
    Workout(WorkoutId),
}

type Handler = Arc<dyn Fn(&Scope) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // Handlers never run under the lock, so poisoning cannot leave it torn.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fan-out register/publish primitive. Clones share one registry.
#[derive(Clone, Default)]
pub struct InvalidationBus {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every future signal until the returned
    /// subscription is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, handler: F) -> BusSubscription
    where
        F: Fn(&Scope) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, Arc::new(handler)));
        BusSubscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invokes every registered handler with `scope` and returns how many
    /// completed without panicking.
    ///
    /// Handlers registered or removed during delivery take effect from the
    /// next publish.
    pub fn publish(&self, scope: Scope) -> usize {
        let handlers: Vec<Handler> = lock(&self.registry)
            .handlers
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        tracing::debug!(?scope, handlers = handlers.len(), "Publishing invalidation");

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&scope))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::warn!(?scope, "Invalidation handler panicked; continuing"),
            }
        }
        delivered
    }

    pub fn handler_count(&self) -> usize {
        lock(&self.registry).handlers.len()
    }
}

/// Live registration on an [`InvalidationBus`]. Unsubscribes on drop.
#[derive(Debug)]
pub struct BusSubscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl BusSubscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).handlers.retain(|(id, _)| *id != self.id);
        }
    }
}
