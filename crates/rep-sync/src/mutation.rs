//! Handles for issued mutations.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone)]
pub enum MutationState<T> {
    Pending,
    Success(T),
    Failed(SyncError),
}

impl<T> MutationState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    fn into_result(self) -> Result<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failed(error) => Err(error),
            Self::Pending => Err(SyncError::Cancelled),
        }
    }
}

/// A mutation running on its own task.
///
/// The work is already under way when the handle is returned and finishes
/// even if the handle is dropped.
pub struct Mutation<T> {
    rx: watch::Receiver<MutationState<T>>,
    runtime: Handle,
}

impl<T> std::fmt::Debug for Mutation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutation")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<T> Mutation<T> {
    pub fn is_pending(&self) -> bool {
        self.rx.borrow().is_pending()
    }
}

impl<T> Mutation<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn spawn<F>(runtime: &Handle, work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(MutationState::Pending);
        runtime.spawn(async move {
            let state = match work.await {
                Ok(value) => MutationState::Success(value),
                Err(error) => MutationState::Failed(error),
            };
            tx.send_replace(state);
        });
        Self {
            rx,
            runtime: runtime.clone(),
        }
    }

    /// A mutation rejected before any work started.
    pub(crate) fn failed(runtime: &Handle, error: SyncError) -> Self {
        let (_, rx) = watch::channel(MutationState::Failed(error));
        Self {
            rx,
            runtime: runtime.clone(),
        }
    }

    pub fn state(&self) -> MutationState<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the outcome.
    pub async fn wait(mut self) -> Result<T> {
        match self.rx.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.clone().into_result(),
            Err(_) => Err(SyncError::Cancelled),
        }
    }

    /// Runs `callback` with the created value once the mutation succeeds.
    pub fn on_success<F>(self, callback: F) -> Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.on_settled(move |state| {
            if let MutationState::Success(value) = state {
                callback(value);
            }
        })
    }

    /// Runs `callback` with the final state, success or failure.
    pub fn on_settled<F>(self, callback: F) -> Self
    where
        F: FnOnce(&MutationState<T>) + Send + 'static,
    {
        let mut rx = self.rx.clone();
        self.runtime.spawn(async move {
            let state = match rx.wait_for(|state| !state.is_pending()).await {
                Ok(state) => state.clone(),
                Err(_) => MutationState::Failed(SyncError::Cancelled),
            };
            callback(&state);
        });
        self
    }
}

