use std::path::Path;

use crate::backend::BackendError;

/// Errors an activity can report to the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
  /// Filesystem access failed.
  #[error("io error at '{path}': {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// The extraction backend failed in a way that is not recoverable inside the step.
  #[error("extraction backend error: {source}")]
  Backend {
    #[source]
    source: BackendError,
  },

  /// The persistence collaborator failed.
  #[error("store error: {source}")]
  Store {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The input can never succeed; retrying is pointless.
  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  /// Any other failure.
  #[error("{message}")]
  Failed { message: String },
}

impl ActivityError {
  pub fn io(path: &Path, source: std::io::Error) -> Self {
    Self::Io {
      path: path.display().to_string(),
      source,
    }
  }

  pub fn store(source: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store {
      source: Box::new(source),
    }
  }

  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput {
      message: message.into(),
    }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }

  /// Whether the retry policy should try this step again.
  pub fn is_retryable(&self) -> bool {
    !matches!(self, Self::InvalidInput { .. })
  }
}
