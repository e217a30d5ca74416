//! Misc utilities.

mod throughput;

pub use throughput::*;

/// The time format used in run directory names.
pub const FILE_STRFTIME: &str = "%Y-%m-%d-%H-%M-%S.%3f%z";
