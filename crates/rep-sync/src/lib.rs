//! Client-side data synchronization for Rep.
//!
//! Views read workouts through live [`Query`] handles and change them through
//! [`Mutation`] handles, both obtained from one [`SyncContext`]. Underneath:
//!
//! ```text
//! view ──mutation──▶ WorkoutBackend ──write──▶ store / remote API
//!                          │
//!                          └─publish(Scope)─▶ InvalidationBus ─▶ QueryCache ─▶ Query
//! ```
//!
//! - [`LocalBackend`] applies each mutation as one serialized read-modify-write
//!   of the whole snapshot with compare-and-swap on its revision.
//! - [`RemoteBackend`] talks to the HTTP API and publishes the same signals.
//! - [`QueryCache`] deduplicates concurrent reads per key, keeps values for
//!   remounts and refetches watched keys on invalidation.
//!
//! # Architecture
//!
//! - `backend.rs` - `WorkoutBackend` trait
//! - `executor.rs` - Mutation Executor over a snapshot store
//! - `remote.rs` - HTTP binding
//! - `cache.rs` - Keys, patterns and the single-flight cache
//! - `query.rs` - Read subscriptions
//! - `mutation.rs` - Mutation handles and completion callbacks
//! - `context.rs` - The facade views use
//! - `bridge.rs` - External change polling
//! - `config.rs` - Configuration
//! - `error.rs` - Error types

mod backend;
mod bridge;
mod cache;
mod config;
mod context;
mod error;
mod executor;
mod mutation;
mod query;
mod remote;

pub use backend::WorkoutBackend;
pub use bridge::ExternalChangeBridge;
pub use cache::{CachedValue, KeyPattern, QueryCache, QueryKey};
pub use config::{BackendConfig, SyncConfig};
pub use context::SyncContext;
pub use error::{Result, SyncError};
pub use executor::LocalBackend;
pub use mutation::{Mutation, MutationState};
pub use query::{Query, QueryState};
pub use remote::RemoteBackend;
