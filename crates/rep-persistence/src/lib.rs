//! Persistent storage for Rep workout data.
//!
//! This crate holds the canonical [`Snapshot`](rep_model::Snapshot) and tells
//! readers when it changes.
//!
//! # Features
//!
//! - **Whole-snapshot writes** with a revision token for compare-and-swap
//! - **Atomic file writes** to prevent data corruption
//! - **Invalidation signals** published after every committed write
//!
//! # Architecture
//!
//! - `bus.rs` - Invalidation Bus and change scopes
//! - `medium/` - Key-value media (file, memory)
//! - `codec.rs` - Versioned JSON snapshot format
//! - `store.rs` - `SnapshotStore` trait and `LocalStore`
//! - `error.rs` - Error types with user-friendly messages

mod bus;
mod codec;
mod error;
mod medium;
mod store;

pub use bus::{BusSubscription, InvalidationBus, Scope};
pub use codec::{CURRENT_SCHEMA_VERSION, decode, encode};
pub use error::{PersistenceError, Result};
pub use medium::{FileMedium, KeyValueMedium, MemoryMedium};
pub use store::{LocalStore, SNAPSHOT_KEY, SnapshotStore};
