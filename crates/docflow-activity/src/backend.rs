//! Extraction backend strategy.
//!
//! The backend is resolved once at process start. When no usable backend is
//! configured, [`UnavailableBackend`] is bound instead and every extraction
//! yields an empty outcome with a warning.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docflow_config::BackendConfig;
use docflow_task::ExtractionModel;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

/// Errors reported by an extraction backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
  /// An optional capability needed for this document is not installed.
  /// Recoverable: the document contributes no results.
  #[error("capability unavailable: {message}")]
  CapabilityUnavailable { message: String },

  /// The request never produced a response.
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The backend answered with a non-success status.
  #[error("backend returned status {status}: {body}")]
  Status { status: u16, body: String },

  /// The backend answered with a body we cannot interpret.
  #[error("invalid backend response: {message}")]
  InvalidResponse { message: String },

  /// The backend configuration is unusable.
  #[error("invalid backend config: {message}")]
  InvalidConfig { message: String },
}

impl BackendError {
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::CapabilityUnavailable { .. })
  }
}

/// Everything a backend needs to extract one document.
#[derive(Debug, Clone, Copy)]
pub struct BackendRequest<'a> {
  pub upload_id: &'a str,
  pub user_id: &'a str,
  pub document_path: &'a str,
  /// Revealed credential, passed through to the backend untouched.
  pub credential: &'a str,
  pub model: ExtractionModel,
}

/// An inference service that extracts result paths from a document.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
  fn name(&self) -> &str;

  async fn extract(&self, request: BackendRequest<'_>) -> Result<Vec<String>, BackendError>;
}

#[derive(Serialize)]
struct ExtractPayload<'a> {
  upload_id: &'a str,
  user_id: &'a str,
  document_path: &'a str,
  model: ExtractionModel,
}

#[derive(Deserialize)]
struct ExtractResponse {
  result_paths: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
  error: String,
  #[serde(default)]
  message: Option<String>,
}

const CAPABILITY_UNAVAILABLE: &str = "capability_unavailable";

/// Backend reached over HTTP.
///
/// Sends `POST <endpoint>` with a JSON body and bearer credential and expects
/// `{"result_paths": [...]}` back.
pub struct HttpBackend {
  client: reqwest::Client,
  endpoint: Url,
}

impl HttpBackend {
  pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
    let endpoint = Url::parse(&config.endpoint).map_err(|e| BackendError::InvalidConfig {
      message: format!("endpoint '{}': {}", config.endpoint, e),
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") {
      return Err(BackendError::InvalidConfig {
        message: format!("unsupported endpoint scheme '{}'", endpoint.scheme()),
      });
    }
    let client = reqwest::Client::builder()
      .timeout(Duration::from_millis(config.request_timeout_ms))
      .build()?;
    Ok(Self { client, endpoint })
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }
}

#[async_trait]
impl ExtractionBackend for HttpBackend {
  fn name(&self) -> &str {
    "http"
  }

  async fn extract(&self, request: BackendRequest<'_>) -> Result<Vec<String>, BackendError> {
    let payload = ExtractPayload {
      upload_id: request.upload_id,
      user_id: request.user_id,
      document_path: request.document_path,
      model: request.model,
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .bearer_auth(request.credential)
      .json(&payload)
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      return Err(classify_failure(status, body));
    }

    let parsed: ExtractResponse =
      serde_json::from_str(&body).map_err(|e| BackendError::InvalidResponse {
        message: e.to_string(),
      })?;
    Ok(parsed.result_paths)
  }
}

/// Map a non-success response to an error, singling out missing capabilities.
fn classify_failure(status: StatusCode, body: String) -> BackendError {
  let structured = serde_json::from_str::<ErrorResponse>(&body).ok();

  if let Some(err) = &structured {
    if err.error == CAPABILITY_UNAVAILABLE {
      return BackendError::CapabilityUnavailable {
        message: err.message.clone().unwrap_or_else(|| err.error.clone()),
      };
    }
  }

  if status == StatusCode::NOT_IMPLEMENTED {
    return BackendError::CapabilityUnavailable {
      message: structured
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("backend returned {status}")),
    };
  }

  BackendError::Status {
    status: status.as_u16(),
    body,
  }
}

/// Stand-in bound when no real backend is available.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
  reason: String,
}

impl UnavailableBackend {
  pub fn new(reason: impl Into<String>) -> Self {
    Self {
      reason: reason.into(),
    }
  }
}

#[async_trait]
impl ExtractionBackend for UnavailableBackend {
  fn name(&self) -> &str {
    "unavailable"
  }

  async fn extract(&self, request: BackendRequest<'_>) -> Result<Vec<String>, BackendError> {
    warn!(
      document_path = %request.document_path,
      reason = %self.reason,
      "extraction backend unavailable, document yields no results"
    );
    Ok(Vec::new())
  }
}

/// Pick the extraction backend for this process.
pub fn resolve_backend(config: Option<&BackendConfig>) -> Arc<dyn ExtractionBackend> {
  let Some(config) = config else {
    warn!("no extraction backend configured, extraction will produce no results");
    return Arc::new(UnavailableBackend::new("no backend configured"));
  };

  match HttpBackend::new(config) {
    Ok(backend) => {
      info!(endpoint = %backend.endpoint(), "extraction backend resolved");
      Arc::new(backend)
    }
    Err(e) => {
      warn!(error = %e, "extraction backend unusable, falling back to stub");
      Arc::new(UnavailableBackend::new(e.to_string()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request() -> BackendRequest<'static> {
    BackendRequest {
      upload_id: "upload-1",
      user_id: "user-1",
      document_path: "/uploads/a.pdf",
      credential: "sk-secret",
      model: ExtractionModel::Gpt4o,
    }
  }

  #[test]
  fn test_classify_capability_body() {
    let err = classify_failure(
      StatusCode::UNPROCESSABLE_ENTITY,
      r#"{"error": "capability_unavailable", "message": "ocr not installed"}"#.to_string(),
    );
    assert!(err.is_recoverable());
    assert_eq!(err.to_string(), "capability unavailable: ocr not installed");
  }

  #[test]
  fn test_classify_not_implemented() {
    let err = classify_failure(StatusCode::NOT_IMPLEMENTED, "nope".to_string());
    assert!(err.is_recoverable());
  }

  #[test]
  fn test_classify_server_error() {
    let err = classify_failure(StatusCode::BAD_GATEWAY, "upstream down".to_string());
    assert!(!err.is_recoverable());
    assert!(matches!(err, BackendError::Status { status: 502, .. }));
  }

  #[test]
  fn test_http_backend_rejects_bad_endpoint() {
    let config = BackendConfig {
      endpoint: "not a url".to_string(),
      request_timeout_ms: 1000,
    };
    assert!(matches!(
      HttpBackend::new(&config),
      Err(BackendError::InvalidConfig { .. })
    ));

    let config = BackendConfig {
      endpoint: "ftp://example.com/extract".to_string(),
      request_timeout_ms: 1000,
    };
    assert!(matches!(
      HttpBackend::new(&config),
      Err(BackendError::InvalidConfig { .. })
    ));
  }

  #[test]
  fn test_resolve_without_config_binds_stub() {
    let backend = resolve_backend(None);
    assert_eq!(backend.name(), "unavailable");

    let bad = BackendConfig {
      endpoint: "::".to_string(),
      request_timeout_ms: 1000,
    };
    assert_eq!(resolve_backend(Some(&bad)).name(), "unavailable");
  }

  #[test]
  fn test_resolve_with_valid_config() {
    let config = BackendConfig {
      endpoint: "http://127.0.0.1:9/extract".to_string(),
      request_timeout_ms: 1000,
    };
    assert_eq!(resolve_backend(Some(&config)).name(), "http");
  }

  #[tokio::test]
  async fn test_unavailable_backend_returns_nothing() {
    let backend = UnavailableBackend::new("not installed");
    let paths = backend.extract(request()).await.unwrap();
    assert!(paths.is_empty());
  }
}
