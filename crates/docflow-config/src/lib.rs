//! Docflow Config
//!
//! Serializable configuration for the ingestion pipeline. Every field has a
//! default so an empty JSON object (or no file at all) yields a working
//! configuration.

mod pipeline;
mod retry;
mod step;

pub use pipeline::{BackendConfig, PipelineConfig};
pub use retry::{ConfigError, RetryPolicy};
pub use step::{StepKind, StepTimeouts};
