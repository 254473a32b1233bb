//! Library components of the `rep` command-line workout log.

pub mod logging;
pub mod settings;
pub mod summary;

pub use settings::{DisplaySettings, Settings, WeightUnit};
