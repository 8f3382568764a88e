//! Docflow Task
//!
//! Immutable descriptors exchanged between the coordinator and the step
//! activities. Everything here is created fresh for a run and dropped once the
//! run's [`WorkflowResult`] is emitted.

mod credential;
mod error;
mod model;
mod request;
mod result;
mod types;

pub use credential::{Credential, reveal_credential};
pub use error::ValidationError;
pub use model::ExtractionModel;
pub use request::WorkflowRequest;
pub use result::{MAX_ERROR_CHARS, TRUNCATION_MARKER, WorkflowResult, bound_error};
pub use types::{
  AggregationRequest, AggregationResult, CleanupRequest, DiscoveryResult, ExtractionOutcome,
  ExtractionTask,
};
