//! Brings writes made by other processes into the local invalidation bus.

use std::sync::Arc;
use std::time::Duration;

use rep_persistence::Scope;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::WorkoutBackend;

/// Polls the backend for changes it did not make itself and publishes a
/// global signal when it finds one. Stops when dropped.
#[derive(Debug)]
pub struct ExternalChangeBridge {
    task: JoinHandle<()>,
}

impl ExternalChangeBridge {
    pub fn spawn(backend: Arc<dyn WorkoutBackend>, every: Duration, runtime: &Handle) -> Self {
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match backend.poll_external_change().await {
                    Ok(true) => {
                        tracing::debug!("External change detected");
                        backend.bus().publish(Scope::All);
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!(error = %e, "Polling for external changes failed"),
                }
            }
        });
        Self { task }
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ExternalChangeBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}
