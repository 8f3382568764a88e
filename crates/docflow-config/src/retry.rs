use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised when a configuration value is out of range.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("retry.max_attempts must be at least 1")]
  ZeroAttempts,

  #[error("retry.backoff_coefficient must be a finite number >= 1.0, got {0}")]
  InvalidCoefficient(f64),

  #[error("invalid config: {message}")]
  Invalid { message: String },
}

/// Bounded retry strategy applied uniformly to every step invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total attempts, including the first one.
  pub max_attempts: u32,
  /// Delay after the first failed attempt.
  pub initial_backoff_ms: u64,
  /// Multiplier applied to the delay after each further failure.
  pub backoff_coefficient: f64,
  /// Upper bound for any single delay.
  pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      initial_backoff_ms: 1_000,
      backoff_coefficient: 2.0,
      max_backoff_ms: 30_000,
    }
  }
}

impl RetryPolicy {
  /// A policy with the given attempt count and no delay between attempts.
  pub fn immediate(max_attempts: u32) -> Self {
    Self {
      max_attempts,
      initial_backoff_ms: 0,
      backoff_coefficient: 1.0,
      max_backoff_ms: 0,
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.max_attempts == 0 {
      return Err(ConfigError::ZeroAttempts);
    }
    if !self.backoff_coefficient.is_finite() || self.backoff_coefficient < 1.0 {
      return Err(ConfigError::InvalidCoefficient(self.backoff_coefficient));
    }
    Ok(())
  }

  /// Delay to wait after the given (1-based) attempt failed.
  pub fn backoff_for(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let delay = self.initial_backoff_ms as f64 * self.backoff_coefficient.powi(exponent);
    let capped = delay.min(self.max_backoff_ms as f64).max(0.0);
    Duration::from_millis(capped as u64)
  }
}
