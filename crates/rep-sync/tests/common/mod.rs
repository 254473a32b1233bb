#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rep_model::{
    Exercise, ExerciseId, ExerciseSet, NewExercise, NewSet, NewWorkout, Revision, SetId, Snapshot,
    Workout, WorkoutId,
};
use rep_persistence::{
    InvalidationBus, KeyValueMedium, LocalStore, MemoryMedium, PersistenceError, Scope,
    SnapshotStore,
};
use rep_sync::{LocalBackend, Result, SyncContext, SyncError, WorkoutBackend};
use tokio::runtime::Handle;

/// Memory medium whose reads take a while, widening read-modify-write windows.
#[derive(Clone, Default)]
pub struct SlowMedium {
    inner: MemoryMedium,
}

impl KeyValueMedium for SlowMedium {
    fn get(&self, key: &str) -> rep_persistence::Result<Option<String>> {
        std::thread::sleep(Duration::from_millis(15));
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> rep_persistence::Result<()> {
        self.inner.set(key, value)
    }

    fn describe(&self) -> String {
        "slow memory".to_string()
    }
}

/// Memory medium whose writes fail while `failing` is set.
#[derive(Clone, Default)]
pub struct FlakyMedium {
    inner: MemoryMedium,
    pub failing: Arc<AtomicBool>,
}

impl KeyValueMedium for FlakyMedium {
    fn get(&self, key: &str) -> rep_persistence::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> rep_persistence::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io {
                operation: "write",
                target: "flaky".to_string(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.set(key, value)
    }

    fn describe(&self) -> String {
        "flaky memory".to_string()
    }
}

/// Store that lets a second writer commit just before each of its next
/// `interference` compare-and-save calls.
pub struct ContendedStore {
    ours: LocalStore<MemoryMedium>,
    theirs: LocalStore<MemoryMedium>,
    interference: AtomicU32,
}

impl ContendedStore {
    pub fn new(interference: u32) -> Self {
        let medium = MemoryMedium::new();
        Self {
            ours: LocalStore::new(medium.clone(), InvalidationBus::new()),
            theirs: LocalStore::new(medium, InvalidationBus::new()),
            interference: AtomicU32::new(interference),
        }
    }
}

#[async_trait]
impl SnapshotStore for ContendedStore {
    async fn load(&self) -> rep_persistence::Result<Snapshot> {
        self.ours.load().await
    }

    async fn save(&self, snapshot: &Snapshot) -> rep_persistence::Result<()> {
        self.ours.save(snapshot).await
    }

    async fn compare_and_save(
        &self,
        expected: Revision,
        snapshot: &Snapshot,
        scope: Scope,
    ) -> rep_persistence::Result<()> {
        let interfere = self
            .interference
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if interfere {
            let mut other = self.theirs.load().await?;
            other.add_workout(&NewWorkout::new("From another tab").unwrap());
            other.revision += 1;
            self.theirs.save(&other).await?;
        }
        self.ours.compare_and_save(expected, snapshot, scope).await
    }

    fn bus(&self) -> &InvalidationBus {
        self.ours.bus()
    }

    fn describe(&self) -> String {
        "contended memory".to_string()
    }
}

/// Backend wrapper counting reads, optionally failing them.
pub struct CountingBackend {
    inner: Arc<dyn WorkoutBackend>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub read_delay: Duration,
    pub fail_reads: AtomicBool,
}

impl CountingBackend {
    pub fn new(inner: Arc<dyn WorkoutBackend>) -> Self {
        Self {
            inner,
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            read_delay: Duration::ZERO,
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SyncError::Network("offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkoutBackend for CountingBackend {
    async fn list_workouts(&self) -> Result<Vec<Workout>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.read_delay).await;
        self.check_reads()?;
        self.inner.list_workouts().await
    }

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.read_delay).await;
        self.check_reads()?;
        self.inner.get_workout(id).await
    }

    async fn create_workout(&self, input: &NewWorkout) -> Result<Workout> {
        self.inner.create_workout(input).await
    }

    async fn delete_workout(&self, id: WorkoutId) -> Result<()> {
        self.inner.delete_workout(id).await
    }

    async fn create_exercise(&self, input: &NewExercise) -> Result<Exercise> {
        self.inner.create_exercise(input).await
    }

    async fn delete_exercise(&self, id: ExerciseId, workout_id: WorkoutId) -> Result<()> {
        self.inner.delete_exercise(id, workout_id).await
    }

    async fn create_set(&self, input: &NewSet) -> Result<ExerciseSet> {
        self.inner.create_set(input).await
    }

    async fn delete_set(&self, id: SetId, workout_id: WorkoutId) -> Result<()> {
        self.inner.delete_set(id, workout_id).await
    }

    fn bus(&self) -> &InvalidationBus {
        self.inner.bus()
    }

    fn describe(&self) -> String {
        format!("counting {}", self.inner.describe())
    }
}

pub fn memory_backend() -> Arc<LocalBackend> {
    let store = LocalStore::new(MemoryMedium::new(), InvalidationBus::new());
    Arc::new(LocalBackend::new(Arc::new(store)))
}

pub fn memory_context() -> SyncContext {
    SyncContext::with_backend(memory_backend(), Handle::current())
}

/// Context over a [`CountingBackend`], returning both.
pub fn counting_context(delay: Duration) -> (SyncContext, Arc<CountingBackend>) {
    let counting = Arc::new(CountingBackend::new(memory_backend()).with_read_delay(delay));
    let context = SyncContext::with_backend(counting.clone(), Handle::current());
    (context, counting)
}

/// Counts signals on a bus until dropped.
pub struct SignalCounter {
    hits: Arc<AtomicUsize>,
    _sub: rep_persistence::BusSubscription,
}

impl SignalCounter {
    pub fn on(bus: &InvalidationBus) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        Self { hits, _sub: sub }
    }

    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}
