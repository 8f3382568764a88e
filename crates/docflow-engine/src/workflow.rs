//! The ingestion coordinator.
//!
//! `IngestWorkflow` sequences one run: discover the upload's documents,
//! extract them one at a time, aggregate every result path into records, and
//! always clean up the source documents. Failures are contained: a run never
//! returns an error, only a [`WorkflowResult`] describing what happened.

use docflow_activity::Activities;
use docflow_config::{PipelineConfig, RetryPolicy, StepKind, StepTimeouts};
use docflow_task::{AggregationResult, WorkflowRequest, WorkflowResult, bound_error};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::StepError;
use crate::events::{NoopNotifier, RunEvent, RunNotifier};
use crate::step::StepPolicy;

/// Label used for request validation failures in the result's error message.
const VALIDATION: &str = "validation";

/// Configuration for the coordinator.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
  /// Applied to every step invocation, cleanup included.
  pub retry: RetryPolicy,
  pub timeouts: StepTimeouts,
}

impl From<&PipelineConfig> for EngineConfig {
  fn from(config: &PipelineConfig) -> Self {
    Self {
      retry: config.retry.clone(),
      timeouts: config.timeouts.clone(),
    }
  }
}

/// A step that failed for good, with the error that ended it.
struct StepFailure {
  step: StepKind,
  error: StepError,
}

impl StepFailure {
  fn at(step: StepKind) -> impl FnOnce(StepError) -> Self {
    move |error| Self { step, error }
  }
}

/// The ingestion coordinator.
///
/// Generic over `N: RunNotifier` to allow different notification strategies.
/// Use `IngestWorkflow::new()` for no-op notifications, or
/// `IngestWorkflow::with_notifier()` to observe run events.
pub struct IngestWorkflow<N: RunNotifier = NoopNotifier> {
  activities: Activities,
  policy: StepPolicy,
  notifier: N,
}

impl IngestWorkflow<NoopNotifier> {
  /// Create a coordinator with no-op notifications.
  pub fn new(activities: Activities, config: EngineConfig) -> Self {
    Self::with_notifier(activities, config, NoopNotifier)
  }
}

impl<N: RunNotifier> IngestWorkflow<N> {
  /// Create a coordinator with a custom notifier.
  pub fn with_notifier(activities: Activities, config: EngineConfig, notifier: N) -> Self {
    Self {
      activities,
      policy: StepPolicy::new(config.retry, config.timeouts),
      notifier,
    }
  }

  /// Execute one run under a freshly generated run id.
  pub async fn run(&self, request: WorkflowRequest, cancel: CancellationToken) -> WorkflowResult {
    let run_id = uuid::Uuid::new_v4().to_string();
    self.run_with_id(&run_id, request, cancel).await
  }

  /// Execute one run.
  ///
  /// Never fails: every outcome, cancellation included, is reported through
  /// the returned result. Cleanup is invoked exactly once for every request
  /// that passes validation, even when `cancel` fires mid-run.
  #[instrument(
    name = "ingest_run",
    skip_all,
    fields(run_id = %run_id, upload_id = %request.upload_id, user_id = %request.user_id)
  )]
  pub async fn run_with_id(
    &self,
    run_id: &str,
    request: WorkflowRequest,
    cancel: CancellationToken,
  ) -> WorkflowResult {
    info!(model = %request.model, "run started");
    self.notifier.notify(RunEvent::RunStarted {
      run_id: run_id.to_string(),
      upload_id: request.upload_id.clone(),
      user_id: request.user_id.clone(),
    });

    if let Err(e) = request.validate() {
      let result = WorkflowResult::failure(VALIDATION, &e);
      warn!(error = %e, "request rejected");
      self.finish(run_id, &result);
      return result;
    }

    // Filled in once discovery succeeds; cleanup runs against whatever is here.
    let mut document_paths = Vec::new();
    let outcome = self
      .extract_and_aggregate(run_id, &request, &mut document_paths, &cancel)
      .await;

    self.clean_up(run_id, &request, document_paths).await;

    let result = match outcome {
      Ok(aggregation) => WorkflowResult::success(aggregation.refs),
      Err(StepFailure { step, error }) => WorkflowResult::failure(step, &error),
    };
    self.finish(run_id, &result);
    result
  }

  /// Discovery, then each document in order, then aggregation.
  ///
  /// Result paths from documents extracted before a failure are dropped with
  /// the failure; nothing partial reaches the store.
  async fn extract_and_aggregate(
    &self,
    run_id: &str,
    request: &WorkflowRequest,
    document_paths: &mut Vec<String>,
    cancel: &CancellationToken,
  ) -> Result<AggregationResult, StepFailure> {
    let discovery = self
      .invoke(run_id, StepKind::Discovery, cancel, || {
        self.activities.discover.discover(request)
      })
      .await
      .map_err(StepFailure::at(StepKind::Discovery))?;

    info!(documents = discovery.len(), "documents discovered");
    *document_paths = discovery.document_paths;

    let mut result_paths = Vec::new();
    for (index, document_path) in document_paths.iter().enumerate() {
      let task = request.extraction_task(document_path);
      let outcome = self
        .invoke(run_id, StepKind::Extraction, cancel, || {
          self.activities.extract.extract(&task)
        })
        .await
        .map_err(StepFailure::at(StepKind::Extraction))?;

      debug!(
        index,
        document_path = %document_path,
        results = outcome.result_paths.len(),
        "document extracted"
      );
      result_paths.extend(outcome.result_paths);
    }

    let aggregation = request.aggregation_request(result_paths);
    self
      .invoke(run_id, StepKind::Aggregation, cancel, || {
        self.activities.aggregate.aggregate(&aggregation)
      })
      .await
      .map_err(StepFailure::at(StepKind::Aggregation))
  }

  /// Remove the discovered documents. Runs on its own token so a cancelled
  /// run still cleans up. A failure here is reported but never changes the
  /// run's result.
  async fn clean_up(&self, run_id: &str, request: &WorkflowRequest, document_paths: Vec<String>) {
    let cleanup = request.cleanup_request(document_paths);
    let guard = CancellationToken::new();

    let outcome = self
      .invoke(run_id, StepKind::Cleanup, &guard, || {
        self.activities.cleanup.cleanup(&cleanup)
      })
      .await;

    if let Err(e) = outcome {
      let message = bound_error(StepKind::Cleanup, &e);
      error!(
        documents = cleanup.document_paths.len(),
        error = %message,
        "cleanup failed, temporary documents may remain"
      );
      self.notifier.notify(RunEvent::CleanupFailed {
        run_id: run_id.to_string(),
        error: message,
      });
    }
  }

  async fn invoke<T, F, Fut>(
    &self,
    run_id: &str,
    step: StepKind,
    cancel: &CancellationToken,
    call: F,
  ) -> Result<T, StepError>
  where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, docflow_activity::ActivityError>>,
  {
    self
      .policy
      .invoke(run_id, step, &self.notifier, cancel, call)
      .await
  }

  fn finish(&self, run_id: &str, result: &WorkflowResult) {
    match result.error() {
      None => {
        info!(refs = result.refs.len(), "run completed");
        self.notifier.notify(RunEvent::RunCompleted {
          run_id: run_id.to_string(),
          refs: result.refs.len(),
        });
      }
      Some(message) => {
        warn!(error = %message, "run failed");
        self.notifier.notify(RunEvent::RunFailed {
          run_id: run_id.to_string(),
          error: message.to_string(),
        });
      }
    }
  }
}
