//! Key-value media the local store persists into.
//!
//! A medium stores opaque strings under string keys. Calls are blocking;
//! [`LocalStore`](crate::LocalStore) drives them on the blocking thread pool.

mod file;
mod memory;

pub use file::FileMedium;
pub use memory::MemoryMedium;

use crate::error::Result;

pub trait KeyValueMedium: Send + Sync + 'static {
    /// Returns `None` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value under `key`. A failed call leaves the previous value
    /// intact.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Human-readable location, used in logs and error messages.
    fn describe(&self) -> String;
}
