use chrono::{DateTime, Utc};
use docflow_task::WorkflowResult;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RunStatus {
  Succeeded,
  Failed,
}

/// A registered extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecordEntry {
  pub record_ref: String,
  pub upload_id: String,
  pub user_id: String,
  pub result_path: String,
  pub created_at: DateTime<Utc>,
}

/// A completed run as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RunRecord {
  pub run_id: String,
  pub upload_id: String,
  pub user_id: String,
  pub status: RunStatus,
  pub refs: Json<Vec<String>>,
  pub error: Option<String>,
  pub started_at: DateTime<Utc>,
  pub completed_at: DateTime<Utc>,
}

impl RunRecord {
  /// Build a history row from a finished run.
  pub fn from_result(
    run_id: impl Into<String>,
    upload_id: impl Into<String>,
    user_id: impl Into<String>,
    result: &WorkflowResult,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
  ) -> Self {
    Self {
      run_id: run_id.into(),
      upload_id: upload_id.into(),
      user_id: user_id.into(),
      status: if result.succeeded {
        RunStatus::Succeeded
      } else {
        RunStatus::Failed
      },
      refs: Json(result.refs.clone()),
      error: result.error().map(str::to_string),
      started_at,
      completed_at,
    }
  }
}
