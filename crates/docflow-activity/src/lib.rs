//! Docflow Activity
//!
//! The four side-effecting steps a run is made of, each behind its own trait so
//! the coordinator can be driven by real collaborators or by test doubles:
//!
//! - [`Discover`] lists the documents of an upload
//! - [`Extract`] turns one document into zero or more result paths
//! - [`Aggregate`] registers result paths and returns stable references
//! - [`Cleanup`] removes the temporary source documents
//!
//! Activities may be executed more than once for the same logical step, so
//! every implementation here is safe to retry.

mod aggregate;
mod backend;
mod cleanup;
mod discover;
mod error;
mod extract;

use std::sync::Arc;

use async_trait::async_trait;
use docflow_task::{
  AggregationRequest, AggregationResult, CleanupRequest, DiscoveryResult, ExtractionOutcome,
  ExtractionTask, WorkflowRequest,
};

pub use aggregate::StoreAggregator;
pub use backend::{
  BackendError, BackendRequest, ExtractionBackend, HttpBackend, UnavailableBackend,
  resolve_backend,
};
pub use cleanup::FsCleanup;
pub use discover::FsDiscovery;
pub use error::ActivityError;
pub use extract::BackendExtractor;

/// Lists candidate documents for an upload. Read-only.
#[async_trait]
pub trait Discover: Send + Sync {
  async fn discover(&self, request: &WorkflowRequest) -> Result<DiscoveryResult, ActivityError>;
}

/// Extracts structured results from a single document.
#[async_trait]
pub trait Extract: Send + Sync {
  async fn extract(&self, task: &ExtractionTask) -> Result<ExtractionOutcome, ActivityError>;
}

/// Persists extraction results. Must accept an empty request.
#[async_trait]
pub trait Aggregate: Send + Sync {
  async fn aggregate(
    &self,
    request: &AggregationRequest,
  ) -> Result<AggregationResult, ActivityError>;
}

/// Removes temporary inputs. Removing an absent path is not an error.
#[async_trait]
pub trait Cleanup: Send + Sync {
  async fn cleanup(&self, request: &CleanupRequest) -> Result<(), ActivityError>;
}

/// The set of activities a coordinator runs against.
#[derive(Clone)]
pub struct Activities {
  pub discover: Arc<dyn Discover>,
  pub extract: Arc<dyn Extract>,
  pub aggregate: Arc<dyn Aggregate>,
  pub cleanup: Arc<dyn Cleanup>,
}

impl Activities {
  pub fn new(
    discover: Arc<dyn Discover>,
    extract: Arc<dyn Extract>,
    aggregate: Arc<dyn Aggregate>,
    cleanup: Arc<dyn Cleanup>,
  ) -> Self {
    Self {
      discover,
      extract,
      aggregate,
      cleanup,
    }
  }
}
