//! Common imports from external crates.

pub use anyhow::{ensure, format_err, Context, Result};
pub use chrono::Local;
pub use futures::stream::{Stream, StreamExt as _};
pub use ndarray::Axis;
pub use nsrec::{
    config::{MetadataConfig, PipelineConfig},
    pipeline::{Batch, BoxBatch, BoxBatchPipeline, DigitBatch, DigitBatchPipeline},
};
pub use serde::{Deserialize, Serialize};
pub use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
pub use tracing::{info, trace_span, Instrument};
