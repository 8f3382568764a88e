use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Extraction models the inference backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionModel {
  #[serde(rename = "gpt-4o")]
  Gpt4o,
  #[serde(rename = "gpt-4o-mini")]
  Gpt4oMini,
  #[serde(rename = "claude-3-5-sonnet")]
  Claude35Sonnet,
  #[serde(rename = "claude-3-7-sonnet")]
  Claude37Sonnet,
}

impl ExtractionModel {
  pub const ALL: [ExtractionModel; 4] = [
    ExtractionModel::Gpt4o,
    ExtractionModel::Gpt4oMini,
    ExtractionModel::Claude35Sonnet,
    ExtractionModel::Claude37Sonnet,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ExtractionModel::Gpt4o => "gpt-4o",
      ExtractionModel::Gpt4oMini => "gpt-4o-mini",
      ExtractionModel::Claude35Sonnet => "claude-3-5-sonnet",
      ExtractionModel::Claude37Sonnet => "claude-3-7-sonnet",
    }
  }
}

impl fmt::Display for ExtractionModel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ExtractionModel {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ExtractionModel::ALL
      .into_iter()
      .find(|m| m.as_str() == s)
      .ok_or_else(|| ValidationError::UnsupportedModel(s.to_string()))
  }
}
