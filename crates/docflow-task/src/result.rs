use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest error message, in characters, surfaced in a [`WorkflowResult`].
pub const MAX_ERROR_CHARS: usize = 10_000;

/// Appended to a message that was cut at [`MAX_ERROR_CHARS`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Final, user-visible outcome of a run.
///
/// Serializes to the wire schema other systems consume:
/// `{"refs": [...], "extraction_successful": bool, "errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
  pub refs: Vec<String>,
  #[serde(rename = "extraction_successful")]
  pub succeeded: bool,
  /// Empty on success, exactly one bounded message on failure.
  pub errors: Vec<String>,
}

impl WorkflowResult {
  pub fn success(refs: Vec<String>) -> Self {
    Self {
      refs,
      succeeded: true,
      errors: Vec::new(),
    }
  }

  /// A failed run. Partial results are never surfaced alongside an error.
  pub fn failure(step: impl fmt::Display, message: impl fmt::Display) -> Self {
    Self {
      refs: Vec::new(),
      succeeded: false,
      errors: vec![bound_error(step, message)],
    }
  }

  pub fn error(&self) -> Option<&str> {
    self.errors.first().map(String::as_str)
  }
}

/// Format `"<step> failed: <message>"`, cutting it to [`MAX_ERROR_CHARS`]
/// characters plus [`TRUNCATION_MARKER`] when longer.
pub fn bound_error(step: impl fmt::Display, message: impl fmt::Display) -> String {
  let full = format!("{step} failed: {message}");
  match full.char_indices().nth(MAX_ERROR_CHARS) {
    Some((cut, _)) => {
      let mut bounded = String::with_capacity(cut + TRUNCATION_MARKER.len());
      bounded.push_str(&full[..cut]);
      bounded.push_str(TRUNCATION_MARKER);
      bounded
    }
    None => full,
  }
}
