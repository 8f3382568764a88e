//! Engine error types.

use docflow_activity::ActivityError;

/// Terminal failure of one step after the retry policy gave up.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
  /// The activity reported an error.
  #[error("{source}")]
  Activity {
    #[source]
    source: ActivityError,
  },

  /// An attempt made no progress within the step timeout.
  #[error("timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// The run was cancelled while the step was in flight or backing off.
  #[error("run cancelled")]
  Cancelled,
}

impl StepError {
  /// Whether another attempt could succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      StepError::Activity { source } => source.is_retryable(),
      StepError::Timeout { .. } => true,
      StepError::Cancelled => false,
    }
  }
}

/// Errors from submitting work to a [`crate::WorkflowRunner`].
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
  /// The runner is no longer accepting submissions.
  #[error("workflow runner channel closed")]
  Closed,

  /// The runner shut down before the run produced a result.
  #[error("workflow runner dropped the run before it completed")]
  Dropped,
}
