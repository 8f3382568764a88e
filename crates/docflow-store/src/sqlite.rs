use std::str::FromStr;

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::debug;

use crate::{RecordEntry, RunRecord, Store, StoreError};

/// SQLite-based store implementation.
#[derive(Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) the database at `url` and apply migrations.
  pub async fn connect(url: &str) -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
      .max_connections(5)
      .connect_with(options)
      .await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// A migrated, private in-memory database.
  ///
  /// Every connection to `sqlite::memory:` is a separate database, so the pool
  /// holds exactly one connection that never expires.
  pub async fn in_memory() -> Result<Self, StoreError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect("sqlite::memory:")
      .await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

impl Store for SqliteStore {
  type Error = StoreError;

  async fn register_records(
    &self,
    upload_id: &str,
    user_id: &str,
    result_paths: &[String],
  ) -> Result<Vec<String>, Self::Error> {
    let mut tx = self.pool.begin().await?;
    let mut refs = Vec::with_capacity(result_paths.len());

    for result_path in result_paths {
      let candidate = format!("rec_{}", uuid::Uuid::new_v4().simple());
      sqlx::query(
        r#"
            INSERT INTO records (record_ref, upload_id, user_id, result_path, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (user_id, upload_id, result_path) DO NOTHING
            "#,
      )
      .bind(&candidate)
      .bind(upload_id)
      .bind(user_id)
      .bind(result_path)
      .bind(Utc::now())
      .execute(&mut *tx)
      .await?;

      let (record_ref,): (String,) = sqlx::query_as(
        r#"
            SELECT record_ref
            FROM records
            WHERE user_id = ? AND upload_id = ? AND result_path = ?
            "#,
      )
      .bind(user_id)
      .bind(upload_id)
      .bind(result_path)
      .fetch_one(&mut *tx)
      .await?;

      refs.push(record_ref);
    }

    tx.commit().await?;
    debug!(upload_id, registered = refs.len(), "records registered");
    Ok(refs)
  }

  async fn list_records(
    &self,
    upload_id: &str,
    user_id: &str,
  ) -> Result<Vec<RecordEntry>, Self::Error> {
    let records = sqlx::query_as(
      r#"
            SELECT record_ref, upload_id, user_id, result_path, created_at
            FROM records
            WHERE user_id = ? AND upload_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
    )
    .bind(user_id)
    .bind(upload_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(records)
  }

  async fn record_run(&self, run: &RunRecord) -> Result<(), Self::Error> {
    sqlx::query(
      r#"
            INSERT INTO runs (run_id, upload_id, user_id, status, refs, error, started_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(&run.run_id)
    .bind(&run.upload_id)
    .bind(&run.user_id)
    .bind(run.status)
    .bind(&run.refs)
    .bind(&run.error)
    .bind(run.started_at)
    .bind(run.completed_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get_run(&self, run_id: &str) -> Result<RunRecord, Self::Error> {
    sqlx::query_as(
      r#"
            SELECT run_id, upload_id, user_id, status, refs, error, started_at, completed_at
            FROM runs
            WHERE run_id = ?
            "#,
    )
    .bind(run_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("run {run_id}")))
  }

  async fn list_runs(
    &self,
    upload_id: &str,
    user_id: &str,
  ) -> Result<Vec<RunRecord>, Self::Error> {
    let runs = sqlx::query_as(
      r#"
            SELECT run_id, upload_id, user_id, status, refs, error, started_at, completed_at
            FROM runs
            WHERE user_id = ? AND upload_id = ?
            ORDER BY started_at DESC
            "#,
    )
    .bind(user_id)
    .bind(upload_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(runs)
  }
}
