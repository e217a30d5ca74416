//! The input pipeline of multi-digit number recognition.
//!
//! Metadata adapters turn annotation files into index-aligned label arrays,
//! and the batch pipelines stream decoded images together with their labels.

mod common;
pub mod config;
pub mod metadata;
pub mod mnist;
pub mod pipeline;
pub mod processor;
pub mod profiling;
#[cfg(feature = "with-tch")]
pub mod with_tch;

pub use bbox;
pub use label;
