//! Run events and notifiers for observability.
//!
//! Events are emitted while a run progresses so consumers can persist state,
//! stream to dashboards, or raise alerts (a failed cleanup leaks temporary
//! files and is worth paging on).

use docflow_config::StepKind;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
  /// The run has started.
  RunStarted {
    run_id: String,
    upload_id: String,
    user_id: String,
  },

  /// An attempt of a step has started.
  StepStarted {
    run_id: String,
    step: StepKind,
    attempt: u32,
  },

  /// An attempt failed and the step will be tried again after a backoff.
  StepRetrying {
    run_id: String,
    step: StepKind,
    attempt: u32,
    error: String,
    backoff_ms: u64,
  },

  /// A step has completed successfully.
  StepCompleted {
    run_id: String,
    step: StepKind,
    attempts: u32,
  },

  /// A step has failed for good.
  StepFailed {
    run_id: String,
    step: StepKind,
    attempts: u32,
    error: String,
  },

  /// Cleanup failed. The run's result is unaffected.
  CleanupFailed { run_id: String, error: String },

  /// The run has completed successfully.
  RunCompleted { run_id: String, refs: usize },

  /// The run has failed.
  RunFailed { run_id: String, error: String },
}

/// Trait for receiving run events.
///
/// The engine calls `notify` for each event; implementations decide what to
/// do with them (persist, broadcast, log, ignore, etc.).
pub trait RunNotifier: Send + Sync {
  /// Called when a run event occurs.
  fn notify(&self, event: RunEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl RunNotifier for NoopNotifier {
  fn notify(&self, _event: RunEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a run. Volume is a handful of
  // events per document.
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
  /// Create a new channel notifier.
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }
}

impl RunNotifier for ChannelNotifier {
  fn notify(&self, event: RunEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

impl<N: RunNotifier + ?Sized> RunNotifier for std::sync::Arc<N> {
  fn notify(&self, event: RunEvent) {
    (**self).notify(event);
  }
}
