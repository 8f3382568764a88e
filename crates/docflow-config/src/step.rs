use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The four step activities a run is composed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
  Discovery,
  Extraction,
  Aggregation,
  Cleanup,
}

impl StepKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      StepKind::Discovery => "discovery",
      StepKind::Extraction => "extraction",
      StepKind::Aggregation => "aggregation",
      StepKind::Cleanup => "cleanup",
    }
  }
}

impl fmt::Display for StepKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Per-attempt forward-progress timeouts, one per step kind.
///
/// Extraction waits on the external inference backend and gets a much larger
/// budget than the other steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTimeouts {
  pub discover_ms: u64,
  pub extract_ms: u64,
  pub aggregate_ms: u64,
  pub cleanup_ms: u64,
}

impl Default for StepTimeouts {
  fn default() -> Self {
    Self {
      discover_ms: 60_000,
      extract_ms: 600_000,
      aggregate_ms: 60_000,
      cleanup_ms: 60_000,
    }
  }
}

impl StepTimeouts {
  /// Timeout applied to a single attempt of the given step.
  pub fn for_step(&self, step: StepKind) -> Duration {
    let ms = match step {
      StepKind::Discovery => self.discover_ms,
      StepKind::Extraction => self.extract_ms,
      StepKind::Aggregation => self.aggregate_ms,
      StepKind::Cleanup => self.cleanup_ms,
    };
    Duration::from_millis(ms)
  }
}
