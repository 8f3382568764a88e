use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::retry::{ConfigError, RetryPolicy};
use crate::step::StepTimeouts;

/// Connection settings for the external inference backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
  /// Extraction endpoint URL.
  pub endpoint: String,
  /// Transport-level timeout for a single HTTP request.
  #[serde(default = "default_request_timeout_ms")]
  pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
  540_000
}

/// Top-level pipeline configuration, usually loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Root for everything docflow writes. Defaults to `~/.docflow` when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data_dir: Option<PathBuf>,
  /// Where uploaded source documents live. Defaults to `<data_dir>/uploads`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub uploads_dir: Option<PathBuf>,
  /// SQLite URL for records and run history. Defaults to `sqlite://<data_dir>/docflow.db`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub database_url: Option<String>,
  pub retry: RetryPolicy,
  pub timeouts: StepTimeouts,
  /// Extraction backend. When absent, extraction runs against a stub that
  /// finds nothing.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub backend: Option<BackendConfig>,
  /// File extensions discovery accepts. Empty means every regular file.
  pub document_extensions: Vec<String>,
  pub max_concurrent_runs: usize,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      data_dir: None,
      uploads_dir: None,
      database_url: None,
      retry: RetryPolicy::default(),
      timeouts: StepTimeouts::default(),
      backend: None,
      document_extensions: Vec::new(),
      max_concurrent_runs: 4,
    }
  }
}

impl PipelineConfig {
  /// Parse a configuration from JSON text and validate it.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let config: PipelineConfig =
      serde_json::from_str(content).map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
      })?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.retry.validate()?;
    if self.max_concurrent_runs == 0 {
      return Err(ConfigError::Invalid {
        message: "max_concurrent_runs must be at least 1".to_string(),
      });
    }
    Ok(())
  }

  /// Uploads directory, falling back to `<data_dir>/uploads`.
  pub fn uploads_dir(&self, data_dir: &std::path::Path) -> PathBuf {
    self
      .uploads_dir
      .clone()
      .unwrap_or_else(|| data_dir.join("uploads"))
  }

  /// Database URL, falling back to a file inside the data directory.
  pub fn database_url(&self, data_dir: &std::path::Path) -> String {
    self
      .database_url
      .clone()
      .unwrap_or_else(|| format!("sqlite://{}", data_dir.join("docflow.db").display()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_object_uses_defaults() {
    let config = PipelineConfig::from_json("{}").unwrap();
    assert_eq!(config, PipelineConfig::default());
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.timeouts.extract_ms, 600_000);
    assert!(config.backend.is_none());
  }

  #[test]
  fn test_partial_override() {
    let config = PipelineConfig::from_json(
      r#"{
        "retry": { "max_attempts": 5 },
        "timeouts": { "extract_ms": 1000 },
        "backend": { "endpoint": "http://localhost:9000/extract" }
      }"#,
    )
    .unwrap();

    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.initial_backoff_ms, 1_000);
    assert_eq!(config.timeouts.extract_ms, 1000);
    assert_eq!(config.timeouts.discover_ms, 60_000);
    let backend = config.backend.unwrap();
    assert_eq!(backend.endpoint, "http://localhost:9000/extract");
    assert_eq!(backend.request_timeout_ms, 540_000);
  }

  #[test]
  fn test_invalid_retry_is_rejected() {
    let result = PipelineConfig::from_json(r#"{ "retry": { "max_attempts": 0 } }"#);
    assert!(matches!(result, Err(ConfigError::ZeroAttempts)));
  }

  #[test]
  fn test_derived_paths() {
    let config = PipelineConfig::default();
    let data_dir = PathBuf::from("/var/lib/docflow");
    assert_eq!(
      config.uploads_dir(&data_dir),
      PathBuf::from("/var/lib/docflow/uploads")
    );
    assert_eq!(
      config.database_url(&data_dir),
      "sqlite:///var/lib/docflow/docflow.db"
    );
  }
}
