use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docflow_activity::{
  Activities, BackendExtractor, FsCleanup, FsDiscovery, StoreAggregator, resolve_backend,
};
use docflow_config::PipelineConfig;
use docflow_engine::{EngineConfig, IngestWorkflow, RunnerHandle, WorkflowRunner};
use docflow_store::{RunRecord, SqliteStore, Store};
use docflow_task::{Credential, ExtractionModel, WorkflowRequest, WorkflowResult};

/// Docflow - ingest uploaded research documents into extraction records
#[derive(Parser)]
#[command(name = "docflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.docflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Pipeline configuration file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Ingest uploads and print one result per upload
  Run {
    /// Upload to ingest; repeat to run several concurrently
    #[arg(long = "upload-id", required = true)]
    upload_ids: Vec<String>,

    #[arg(long)]
    user_id: String,

    /// Extraction model (gpt-4o, gpt-4o-mini, claude-3-5-sonnet, claude-3-7-sonnet)
    #[arg(long)]
    model: String,

    /// Environment variable holding the extraction credential
    #[arg(long, default_value = "DOCFLOW_CREDENTIAL")]
    credential_env: String,
  },

  /// Show run history for an upload
  Runs {
    #[arg(long)]
    upload_id: String,

    #[arg(long)]
    user_id: String,
  },

  /// Show registered records for an upload
  Records {
    #[arg(long)]
    upload_id: String,

    #[arg(long)]
    user_id: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive("docflow=info".parse()?))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let Some(command) = cli.command else {
    println!("docflow - use --help to see available commands");
    return Ok(());
  };

  let config = load_config(cli.config.as_deref())?;
  let data_dir = resolve_data_dir(cli.data_dir, &config)?;

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match command {
      Commands::Run {
        upload_ids,
        user_id,
        model,
        credential_env,
      } => {
        let model: ExtractionModel = model.parse()?;
        let credential = std::env::var(&credential_env).with_context(|| {
          format!("credential environment variable {credential_env} is not set")
        })?;
        let credential = Credential::new(credential);
        let requests = upload_ids
          .into_iter()
          .map(|upload_id| WorkflowRequest::new(upload_id, &user_id, credential.clone(), model))
          .collect();
        run_uploads(requests, &config, &data_dir).await
      }
      Commands::Runs { upload_id, user_id } => {
        let store = open_store(&config, &data_dir).await?;
        let runs = store
          .list_runs(&upload_id, &user_id)
          .await
          .context("failed to list runs")?;
        println!("{}", serde_json::to_string_pretty(&runs)?);
        Ok(())
      }
      Commands::Records { upload_id, user_id } => {
        let store = open_store(&config, &data_dir).await?;
        let records = store
          .list_records(&upload_id, &user_id)
          .await
          .context("failed to list records")?;
        println!("{}", serde_json::to_string_pretty(&records)?);
        Ok(())
      }
    }
  })
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
  let Some(path) = path else {
    return Ok(PipelineConfig::default());
  };

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  PipelineConfig::from_json(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))
}

fn resolve_data_dir(flag: Option<PathBuf>, config: &PipelineConfig) -> Result<PathBuf> {
  if let Some(dir) = flag.or_else(|| config.data_dir.clone()) {
    return Ok(dir);
  }
  let home = dirs::home_dir().context("could not determine home directory")?;
  Ok(home.join(".docflow"))
}

async fn open_store(config: &PipelineConfig, data_dir: &Path) -> Result<Arc<SqliteStore>> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let url = config.database_url(data_dir);
  let store = SqliteStore::connect(&url)
    .await
    .with_context(|| format!("failed to open database: {url}"))?;
  Ok(Arc::new(store))
}

/// Run every request through a bounded runner and print the results in
/// request order, one JSON line each.
async fn run_uploads(
  requests: Vec<WorkflowRequest>,
  config: &PipelineConfig,
  data_dir: &Path,
) -> Result<()> {
  let store = open_store(config, data_dir).await?;
  let uploads_dir = config.uploads_dir(data_dir);

  let activities = Activities::new(
    Arc::new(FsDiscovery::new(&uploads_dir).with_extensions(&config.document_extensions)),
    Arc::new(BackendExtractor::new(resolve_backend(config.backend.as_ref()))),
    Arc::new(StoreAggregator::new(store.clone())),
    Arc::new(FsCleanup::new(&uploads_dir)),
  );
  let workflow = Arc::new(IngestWorkflow::new(activities, EngineConfig::from(config)));
  let runner = WorkflowRunner::new(workflow, config.max_concurrent_runs);
  let handle = runner.handle();

  let cancel = CancellationToken::new();
  tokio::spawn({
    let cancel = cancel.clone();
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, cancelling runs");
        cancel.cancel();
      }
    }
  });
  let runner_task = tokio::spawn(runner.start(cancel));

  let runs: Vec<_> = requests
    .into_iter()
    .map(|request| tokio::spawn(submit_and_record(handle.clone(), store.clone(), request)))
    .collect();
  drop(handle);

  for run in runs {
    let result = run.await.context("run task failed")??;
    println!("{}", serde_json::to_string(&result)?);
  }

  runner_task.await.context("workflow runner failed")?;
  Ok(())
}

async fn submit_and_record(
  handle: RunnerHandle,
  store: Arc<SqliteStore>,
  request: WorkflowRequest,
) -> Result<WorkflowResult> {
  let run_id = uuid::Uuid::new_v4().to_string();
  let upload_id = request.upload_id.clone();
  let user_id = request.user_id.clone();
  let started_at = Utc::now();

  let result = handle
    .submit_with_id(&run_id, request)
    .await
    .with_context(|| format!("run for upload {upload_id} did not complete"))?;

  let record = RunRecord::from_result(
    &run_id,
    upload_id,
    user_id,
    &result,
    started_at,
    Utc::now(),
  );
  match store.record_run(&record).await {
    Ok(()) => info!(run_id = %run_id, "run recorded"),
    Err(e) => warn!(run_id = %run_id, error = %e, "failed to record run"),
  }

  Ok(result)
}
