//! Workflow runner with channel-based submission.
//!
//! The `WorkflowRunner` owns an mpsc channel of run submissions and executes
//! each one on its own task, bounded by `max_concurrent_runs`.

use std::sync::Arc;

use docflow_task::{WorkflowRequest, WorkflowResult};
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::RunnerError;
use crate::events::{NoopNotifier, RunNotifier};
use crate::workflow::IngestWorkflow;

/// A request waiting to run, with the channel its result goes back on.
struct RunSubmission {
  run_id: String,
  request: WorkflowRequest,
  reply: oneshot::Sender<WorkflowResult>,
}

/// Cloneable handle for submitting runs to a [`WorkflowRunner`].
#[derive(Clone)]
pub struct RunnerHandle {
  sender: mpsc::Sender<RunSubmission>,
}

impl RunnerHandle {
  /// Submit a run under a fresh run id and wait for its result.
  pub async fn submit(&self, request: WorkflowRequest) -> Result<WorkflowResult, RunnerError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    self.submit_with_id(run_id, request).await
  }

  /// Submit a run under the given run id and wait for its result.
  pub async fn submit_with_id(
    &self,
    run_id: impl Into<String>,
    request: WorkflowRequest,
  ) -> Result<WorkflowResult, RunnerError> {
    let (reply, result) = oneshot::channel();
    let submission = RunSubmission {
      run_id: run_id.into(),
      request,
      reply,
    };
    self
      .sender
      .send(submission)
      .await
      .map_err(|_| RunnerError::Closed)?;
    result.await.map_err(|_| RunnerError::Dropped)
  }
}

/// A runner that executes ingestion runs as they are submitted.
///
/// # Usage
///
/// ```ignore
/// let runner = WorkflowRunner::new(workflow, 4);
///
/// // Hand out handles to whatever produces uploads
/// let handle = runner.handle();
///
/// // Start the execution loop
/// let cancel = CancellationToken::new();
/// tokio::spawn(runner.start(cancel.clone()));
///
/// let result = handle.submit(request).await?;
/// ```
pub struct WorkflowRunner<N: RunNotifier = NoopNotifier> {
  sender: mpsc::Sender<RunSubmission>,
  receiver: mpsc::Receiver<RunSubmission>,
  workflow: Arc<IngestWorkflow<N>>,
  max_concurrent_runs: usize,
}

impl<N: RunNotifier + 'static> WorkflowRunner<N> {
  /// Create a new runner.
  pub fn new(workflow: Arc<IngestWorkflow<N>>, max_concurrent_runs: usize) -> Self {
    Self::with_buffer_size(workflow, max_concurrent_runs, 100)
  }

  /// Create a new runner with a custom submission buffer size.
  pub fn with_buffer_size(
    workflow: Arc<IngestWorkflow<N>>,
    max_concurrent_runs: usize,
    buffer_size: usize,
  ) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      workflow,
      max_concurrent_runs: max_concurrent_runs.max(1),
    }
  }

  /// Get a handle for submitting runs.
  pub fn handle(&self) -> RunnerHandle {
    RunnerHandle {
      sender: self.sender.clone(),
    }
  }

  /// Execute a single run directly (without the loop).
  pub async fn execute_once(
    &self,
    request: WorkflowRequest,
    cancel: CancellationToken,
  ) -> WorkflowResult {
    self.workflow.run(request, cancel).await
  }

  /// Start the execution loop.
  ///
  /// Returns once the cancellation token is triggered or every handle has
  /// been dropped, and only after in-flight runs (and their cleanup) have
  /// finished.
  pub async fn start(self, cancel: CancellationToken) {
    let Self {
      sender,
      mut receiver,
      workflow,
      max_concurrent_runs,
    } = self;
    // Only handles keep the channel open from here on.
    drop(sender);

    info!(max_concurrent_runs, "starting workflow runner");

    let permits = Arc::new(Semaphore::new(max_concurrent_runs));
    let mut runs = JoinSet::new();

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(in_flight = runs.len(), "workflow runner cancelled");
          break;
        }
        Some(joined) = runs.join_next(), if !runs.is_empty() => {
          if let Err(e) = joined {
            error!(error = %e, "run task panicked");
          }
        }
        submission = receiver.recv() => {
          let Some(RunSubmission { run_id, request, reply }) = submission else {
            info!("workflow runner channel closed");
            break;
          };

          let workflow = workflow.clone();
          let permits = permits.clone();
          let run_cancel = cancel.child_token();
          runs.spawn(async move {
            // The semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            let result = workflow.run_with_id(&run_id, request, run_cancel).await;
            // Submitter may have stopped waiting
            let _ = reply.send(result);
          });
        }
      }
    }

    while let Some(joined) = runs.join_next().await {
      if let Err(e) = joined {
        error!(error = %e, "run task panicked");
      }
    }
    info!("workflow runner stopped");
  }
}
