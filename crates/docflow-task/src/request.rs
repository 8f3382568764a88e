use serde::{Deserialize, Serialize};

use crate::credential::{Credential, reveal_credential};
use crate::error::ValidationError;
use crate::model::ExtractionModel;
use crate::types::{AggregationRequest, CleanupRequest, ExtractionTask};

/// The input to one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRequest {
  pub upload_id: String,
  pub user_id: String,
  pub credential: Credential,
  pub model: ExtractionModel,
}

/// Wire form of a request with the credential written in clear.
#[derive(Serialize)]
struct TransportRequest<'a> {
  upload_id: &'a str,
  user_id: &'a str,
  #[serde(serialize_with = "reveal_credential")]
  credential: &'a Credential,
  model: ExtractionModel,
}

impl WorkflowRequest {
  pub fn new(
    upload_id: impl Into<String>,
    user_id: impl Into<String>,
    credential: Credential,
    model: ExtractionModel,
  ) -> Self {
    Self {
      upload_id: upload_id.into(),
      user_id: user_id.into(),
      credential,
      model,
    }
  }

  /// Check the request before any step runs.
  ///
  /// Identifiers become directory names, so anything that could escape the
  /// uploads root is rejected.
  pub fn validate(&self) -> Result<(), ValidationError> {
    validate_identifier("upload_id", &self.upload_id)?;
    validate_identifier("user_id", &self.user_id)?;
    if self.credential.is_empty() {
      return Err(ValidationError::MissingField {
        field: "credential",
      });
    }
    Ok(())
  }

  /// Serialize for handing the request to another process. This is the only
  /// serialization that carries the real credential.
  pub fn to_transport_json(&self) -> serde_json::Value {
    let transport = TransportRequest {
      upload_id: &self.upload_id,
      user_id: &self.user_id,
      credential: &self.credential,
      model: self.model,
    };
    // Plain strings and a unit enum cannot fail to serialize.
    serde_json::to_value(transport).unwrap_or(serde_json::Value::Null)
  }

  pub fn extraction_task(&self, document_path: &str) -> ExtractionTask {
    ExtractionTask {
      upload_id: self.upload_id.clone(),
      user_id: self.user_id.clone(),
      document_path: document_path.to_string(),
      credential: self.credential.clone(),
      model: self.model,
    }
  }

  pub fn aggregation_request(&self, result_paths: Vec<String>) -> AggregationRequest {
    AggregationRequest {
      upload_id: self.upload_id.clone(),
      user_id: self.user_id.clone(),
      result_paths,
    }
  }

  pub fn cleanup_request(&self, document_paths: Vec<String>) -> CleanupRequest {
    CleanupRequest {
      upload_id: self.upload_id.clone(),
      user_id: self.user_id.clone(),
      document_paths,
    }
  }
}

fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    return Err(ValidationError::MissingField { field });
  }
  if value.contains(['/', '\\']) {
    return Err(ValidationError::InvalidIdentifier {
      field,
      value: value.to_string(),
      message: "must not contain path separators",
    });
  }
  if value == "." || value.contains("..") {
    return Err(ValidationError::InvalidIdentifier {
      field,
      value: value.to_string(),
      message: "must not contain relative path segments",
    });
  }
  Ok(())
}
