use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::model::ExtractionModel;

/// Documents found for an upload, in extraction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
  pub document_paths: Vec<String>,
}

impl DiscoveryResult {
  pub fn new(document_paths: Vec<String>) -> Self {
    Self { document_paths }
  }

  pub fn is_empty(&self) -> bool {
    self.document_paths.is_empty()
  }

  pub fn len(&self) -> usize {
    self.document_paths.len()
  }
}

/// One extraction unit: a single discovered document plus the request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTask {
  pub upload_id: String,
  pub user_id: String,
  pub document_path: String,
  pub credential: Credential,
  pub model: ExtractionModel,
}

/// Result paths produced by one extraction. Empty is a valid outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionOutcome {
  pub result_paths: Vec<String>,
}

impl ExtractionOutcome {
  pub fn new(result_paths: Vec<String>) -> Self {
    Self { result_paths }
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.result_paths.is_empty()
  }
}

/// Input to the aggregation step: every result path, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRequest {
  pub upload_id: String,
  pub user_id: String,
  pub result_paths: Vec<String>,
}

/// References to the persisted entries, in the order of the request's paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationResult {
  pub refs: Vec<String>,
}

impl AggregationResult {
  pub fn new(refs: Vec<String>) -> Self {
    Self { refs }
  }
}

/// Input to the cleanup step: every discovered path, processed or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupRequest {
  pub upload_id: String,
  pub user_id: String,
  pub document_paths: Vec<String>,
}
