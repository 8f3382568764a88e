//! Docflow Store
//!
//! Persistence for the pipeline's aggregation step and for run history.
//!
//! The [`Store`] trait defines operations for:
//! - Registering extraction result paths and handing back stable references
//! - Recording and querying completed runs

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use types::{RecordEntry, RunRecord, RunStatus};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// Applying schema migrations failed.
  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Storage trait for registered records and run history.
pub trait Store: Send + Sync {
  /// Error type for storage operations.
  type Error: std::error::Error + Send + Sync + 'static;

  /// Register result paths for an upload and return one reference per path,
  /// in input order. Registering the same path for the same user and upload
  /// twice returns the same reference.
  fn register_records(
    &self,
    upload_id: &str,
    user_id: &str,
    result_paths: &[String],
  ) -> impl std::future::Future<Output = Result<Vec<String>, Self::Error>> + Send;

  /// List records registered for a user's upload, oldest first.
  fn list_records(
    &self,
    upload_id: &str,
    user_id: &str,
  ) -> impl std::future::Future<Output = Result<Vec<RecordEntry>, Self::Error>> + Send;

  /// Persist the outcome of a run.
  fn record_run(
    &self,
    run: &RunRecord,
  ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

  /// Get a run by ID.
  fn get_run(
    &self,
    run_id: &str,
  ) -> impl std::future::Future<Output = Result<RunRecord, Self::Error>> + Send;

  /// List runs for a user's upload, newest first.
  fn list_runs(
    &self,
    upload_id: &str,
    user_id: &str,
  ) -> impl std::future::Future<Output = Result<Vec<RunRecord>, Self::Error>> + Send;
}
