use std::sync::Arc;

use async_trait::async_trait;
use docflow_task::{ExtractionOutcome, ExtractionTask};
use tracing::{debug, warn};

use crate::backend::{BackendRequest, ExtractionBackend};
use crate::error::ActivityError;
use crate::Extract;

/// Extract activity backed by an [`ExtractionBackend`].
///
/// Missing optional capabilities are reported as an empty outcome so the run
/// keeps going; every other backend failure surfaces as a retryable error.
pub struct BackendExtractor {
  backend: Arc<dyn ExtractionBackend>,
}

impl BackendExtractor {
  pub fn new(backend: Arc<dyn ExtractionBackend>) -> Self {
    Self { backend }
  }
}

#[async_trait]
impl Extract for BackendExtractor {
  async fn extract(&self, task: &ExtractionTask) -> Result<ExtractionOutcome, ActivityError> {
    let request = BackendRequest {
      upload_id: &task.upload_id,
      user_id: &task.user_id,
      document_path: &task.document_path,
      credential: task.credential.reveal(),
      model: task.model,
    };

    match self.backend.extract(request).await {
      Ok(result_paths) => {
        debug!(
          backend = self.backend.name(),
          document_path = %task.document_path,
          results = result_paths.len(),
          "document extracted"
        );
        Ok(ExtractionOutcome::new(result_paths))
      }
      Err(e) if e.is_recoverable() => {
        warn!(
          backend = self.backend.name(),
          document_path = %task.document_path,
          error = %e,
          "extraction skipped, document yields no results"
        );
        Ok(ExtractionOutcome::empty())
      }
      Err(e) => Err(ActivityError::Backend { source: e }),
    }
  }
}
