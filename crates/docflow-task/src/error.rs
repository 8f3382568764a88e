use thiserror::Error;

/// Reasons a request is rejected before any step runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("missing required field: {field}")]
  MissingField { field: &'static str },

  #[error("invalid {field} '{value}': {message}")]
  InvalidIdentifier {
    field: &'static str,
    value: String,
    message: &'static str,
  },

  #[error("unsupported extraction model '{0}'")]
  UnsupportedModel(String),
}
