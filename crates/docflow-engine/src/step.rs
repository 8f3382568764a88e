//! Bounded, timed execution of a single step.

use std::future::Future;

use docflow_activity::ActivityError;
use docflow_config::{RetryPolicy, StepKind, StepTimeouts};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::StepError;
use crate::events::{RunEvent, RunNotifier};

/// Applies the retry policy and step timeouts to activity invocations.
#[derive(Debug, Clone, Default)]
pub(crate) struct StepPolicy {
  retry: RetryPolicy,
  timeouts: StepTimeouts,
}

impl StepPolicy {
  pub(crate) fn new(retry: RetryPolicy, timeouts: StepTimeouts) -> Self {
    Self { retry, timeouts }
  }

  /// Invoke `call` until it succeeds, fails with a non-retryable error, or
  /// the attempt budget is spent.
  ///
  /// Every attempt is bounded by the step's timeout. Cancellation interrupts
  /// an attempt or a backoff and is never retried.
  #[instrument(name = "step", skip_all, fields(step = %step))]
  pub(crate) async fn invoke<T, F, Fut, N>(
    &self,
    run_id: &str,
    step: StepKind,
    notifier: &N,
    cancel: &CancellationToken,
    mut call: F,
  ) -> Result<T, StepError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ActivityError>>,
    N: RunNotifier + ?Sized,
  {
    let timeout = self.timeouts.for_step(step);
    let max_attempts = self.retry.max_attempts.max(1);
    let mut attempt = 0;

    loop {
      attempt += 1;
      notifier.notify(RunEvent::StepStarted {
        run_id: run_id.to_string(),
        step,
        attempt,
      });

      let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StepError::Cancelled),
        result = tokio::time::timeout(timeout, call()) => match result {
          Ok(Ok(value)) => Ok(value),
          Ok(Err(source)) => Err(StepError::Activity { source }),
          Err(_) => Err(StepError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
          }),
        },
      };

      let error = match outcome {
        Ok(value) => {
          debug!(run_id, %step, attempt, "step completed");
          notifier.notify(RunEvent::StepCompleted {
            run_id: run_id.to_string(),
            step,
            attempts: attempt,
          });
          return Ok(value);
        }
        Err(error) => error,
      };

      if !error.is_retryable() || attempt >= max_attempts {
        return Err(self.give_up(run_id, step, attempt, notifier, error));
      }

      let backoff = self.retry.backoff_for(attempt);
      warn!(
        run_id,
        %step,
        attempt,
        backoff_ms = backoff.as_millis() as u64,
        error = %error,
        "step attempt failed, retrying"
      );
      notifier.notify(RunEvent::StepRetrying {
        run_id: run_id.to_string(),
        step,
        attempt,
        error: error.to_string(),
        backoff_ms: backoff.as_millis() as u64,
      });

      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          return Err(self.give_up(run_id, step, attempt, notifier, StepError::Cancelled));
        }
        _ = tokio::time::sleep(backoff) => {}
      }
    }
  }

  fn give_up<N: RunNotifier + ?Sized>(
    &self,
    run_id: &str,
    step: StepKind,
    attempts: u32,
    notifier: &N,
    error: StepError,
  ) -> StepError {
    warn!(run_id, %step, attempts, error = %error, "step failed");
    notifier.notify(RunEvent::StepFailed {
      run_id: run_id.to_string(),
      step,
      attempts,
      error: error.to_string(),
    });
    error
  }
}
