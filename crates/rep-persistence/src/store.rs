//! The Entity Store: atomic whole-snapshot reads and writes.
//!
//! [`SnapshotStore`] is the seam the sync layer depends on. [`LocalStore`]
//! implements it over any [`KeyValueMedium`], keeping one encoded snapshot
//! under a fixed key. Every successful write publishes one signal on the
//! store's [`InvalidationBus`] after the medium has committed; a failed write
//! publishes nothing.
//!
//! Writers that must not lose concurrent updates use
//! [`SnapshotStore::compare_and_save`], which commits only if the stored
//! revision still equals the one the writer read.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rep_model::{Revision, Snapshot};
use tokio::sync::Mutex;

use crate::bus::{InvalidationBus, Scope};
use crate::codec;
use crate::error::{PersistenceError, Result};
use crate::medium::KeyValueMedium;

/// Key the snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "workouts_data";

const UNKNOWN_REVISION: u64 = u64::MAX;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns the stored snapshot, or an empty one when nothing is stored.
    async fn load(&self) -> Result<Snapshot>;

    /// Stores `snapshot` exactly as given, replacing the previous one, then
    /// publishes [`Scope::All`]. Data written by a newer schema is never
    /// replaced.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Stores `snapshot` only if the stored revision equals `expected`, then
    /// publishes `scope`. Fails with [`PersistenceError::Conflict`] otherwise.
    async fn compare_and_save(
        &self,
        expected: Revision,
        snapshot: &Snapshot,
        scope: Scope,
    ) -> Result<()>;

    fn bus(&self) -> &InvalidationBus;

    fn describe(&self) -> String;

    /// Reports whether another writer committed since this store last looked.
    async fn poll_external_change(&self) -> Result<bool> {
        Ok(false)
    }

    /// [`load`](Self::load) for readers: any failure is logged and read as an
    /// empty store.
    async fn load_or_empty(&self) -> Snapshot {
        match self.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(store = %self.describe(), error = %e, "Reading store as empty");
                Snapshot::empty()
            }
        }
    }
}

/// Snapshot store over a key-value medium.
///
/// Writes through one `LocalStore` are serialized. Separate stores over a
/// shared medium (other tabs or processes) are detected through revisions
/// but not locked against.
pub struct LocalStore<M> {
    medium: Arc<M>,
    key: String,
    bus: InvalidationBus,
    write_lock: Mutex<()>,
    /// Revision this store last wrote or observed through polling.
    known_revision: AtomicU64,
}

impl<M: KeyValueMedium> LocalStore<M> {
    pub fn new(medium: M, bus: InvalidationBus) -> Self {
        tracing::info!("Opened local store at {}", medium.describe());
        Self {
            medium: Arc::new(medium),
            key: SNAPSHOT_KEY.to_string(),
            bus,
            write_lock: Mutex::new(()),
            known_revision: AtomicU64::new(UNKNOWN_REVISION),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    async fn read_text(&self) -> Result<Option<String>> {
        let medium = Arc::clone(&self.medium);
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || medium.get(&key))
            .await
            .map_err(|source| PersistenceError::TaskFailed { source })?
    }

    async fn write_text(&self, text: String) -> Result<()> {
        let medium = Arc::clone(&self.medium);
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || medium.set(&key, &text))
            .await
            .map_err(|source| PersistenceError::TaskFailed { source })?
    }

    async fn read_snapshot(&self) -> Result<Snapshot> {
        match self.read_text().await? {
            Some(text) => codec::decode(&text, &self.medium.describe()),
            None => Ok(Snapshot::empty()),
        }
    }

    /// Revision a write must expect. Undecodable data is copied aside under
    /// a backup key and counts as revision 0, so a writer starting over from
    /// an empty snapshot can replace it. If the copy fails nothing is
    /// replaced.
    async fn revision_for_write(&self) -> Result<Revision> {
        let Some(text) = self.read_text().await? else {
            return Ok(0);
        };
        match codec::decode(&text, &self.medium.describe()) {
            Ok(snapshot) => Ok(snapshot.revision),
            Err(e) if e.is_corrupt() => {
                let backup = self.preserve(text).await?;
                tracing::warn!(
                    error = %e,
                    %backup,
                    "Kept a copy of the corrupt snapshot before replacing it"
                );
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Writes `text` under the first free `<key>.corrupt[-n]` key and
    /// returns that key. Identical copies are not written twice.
    async fn preserve(&self, text: String) -> Result<String> {
        let medium = Arc::clone(&self.medium);
        let base = format!("{}.corrupt", self.key);
        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut key = base.clone();
            let mut n = 1;
            loop {
                match medium.get(&key)? {
                    Some(existing) if existing == text => return Ok(key),
                    Some(_) => {
                        n += 1;
                        key = format!("{base}-{n}");
                    }
                    None => {
                        medium.set(&key, &text)?;
                        return Ok(key);
                    }
                }
            }
        })
        .await
        .map_err(|source| PersistenceError::TaskFailed { source })?
    }

    /// Encodes before touching the medium, so a serialization failure leaves
    /// the stored snapshot intact.
    async fn commit(&self, snapshot: &Snapshot) -> Result<Revision> {
        let text = codec::encode(snapshot)?;
        self.write_text(text).await?;
        Ok(self.known_revision.swap(snapshot.revision, Ordering::SeqCst))
    }
}

#[async_trait]
impl<M: KeyValueMedium> SnapshotStore for LocalStore<M> {
    async fn load(&self) -> Result<Snapshot> {
        self.read_snapshot().await
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let guard = self.write_lock.lock().await;
        self.revision_for_write().await?;
        self.commit(snapshot).await?;
        drop(guard);

        tracing::info!(revision = snapshot.revision, "Saved snapshot");
        self.bus.publish(Scope::All);
        Ok(())
    }

    async fn compare_and_save(
        &self,
        expected: Revision,
        snapshot: &Snapshot,
        scope: Scope,
    ) -> Result<()> {
        let guard = self.write_lock.lock().await;
        let found = self.revision_for_write().await?;
        if found != expected {
            return Err(PersistenceError::Conflict { expected, found });
        }
        let previous = self.commit(snapshot).await?;
        drop(guard);

        // Readers have not been told about revisions between the last one
        // this store knew and `expected`.
        let scope = if previous == expected { scope } else { Scope::All };
        tracing::debug!(revision = snapshot.revision, ?scope, "Committed snapshot");
        self.bus.publish(scope);
        Ok(())
    }

    fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    fn describe(&self) -> String {
        self.medium.describe()
    }

    async fn poll_external_change(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let revision = self.read_snapshot().await?.revision;
        let previous = self.known_revision.swap(revision, Ordering::SeqCst);
        Ok(previous != UNKNOWN_REVISION && previous != revision)
    }
}
