#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docflow_activity::{Activities, ActivityError, Aggregate, Cleanup, Discover, Extract};
use docflow_config::{RetryPolicy, StepTimeouts};
use docflow_engine::EngineConfig;
use docflow_task::{
  AggregationRequest, AggregationResult, CleanupRequest, Credential, DiscoveryResult,
  ExtractionModel, ExtractionOutcome, ExtractionTask, WorkflowRequest,
};

/// One observed activity invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  Discover,
  Extract(String),
  Aggregate(Vec<String>),
  Cleanup(Vec<String>),
}

/// Scripted stand-in for all four activities.
#[derive(Default)]
pub struct Script {
  pub documents: Vec<String>,
  pub results: HashMap<String, Vec<String>>,
  /// Discovery fails this many times before succeeding.
  pub discover_failures: AtomicU32,
  pub discover_error: Option<String>,
  /// Documents whose extraction always fails with the given message.
  pub failing: HashMap<String, String>,
  /// Documents whose extraction fails once, then succeeds.
  pub flaky: Mutex<HashSet<String>>,
  /// Documents whose extraction never finishes.
  pub hanging: HashSet<String>,
  /// Every extraction takes this long.
  pub extract_delay: Option<Duration>,
  /// Aggregation fails this many times before succeeding.
  pub aggregate_failures: AtomicU32,
  pub in_flight: AtomicU32,
  pub peak_in_flight: AtomicU32,
  pub aggregate_error: Option<ActivityError>,
  pub cleanup_error: Option<String>,
  pub calls: Mutex<Vec<Call>>,
}

impl Script {
  pub fn with_documents(documents: &[(&str, &[&str])]) -> Self {
    Self {
      documents: documents.iter().map(|(doc, _)| doc.to_string()).collect(),
      results: documents
        .iter()
        .map(|(doc, results)| {
          (
            doc.to_string(),
            results.iter().map(|r| r.to_string()).collect(),
          )
        })
        .collect(),
      ..Self::default()
    }
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
    self.calls().iter().filter(|c| matches(c)).count()
  }

  /// Most extractions observed running at the same time.
  pub fn max_in_flight(&self) -> u32 {
    self.peak_in_flight.load(Ordering::SeqCst)
  }

  fn record(&self, call: Call) {
    self.calls.lock().unwrap().push(call);
  }
}

#[async_trait]
impl Discover for Script {
  async fn discover(&self, _request: &WorkflowRequest) -> Result<DiscoveryResult, ActivityError> {
    self.record(Call::Discover);
    if let Some(message) = &self.discover_error {
      return Err(ActivityError::failed(message.clone()));
    }
    let remaining = self.discover_failures.load(Ordering::SeqCst);
    if remaining > 0 {
      self.discover_failures.store(remaining - 1, Ordering::SeqCst);
      return Err(ActivityError::failed("listing unavailable"));
    }
    Ok(DiscoveryResult::new(self.documents.clone()))
  }
}

#[async_trait]
impl Extract for Script {
  async fn extract(&self, task: &ExtractionTask) -> Result<ExtractionOutcome, ActivityError> {
    self.record(Call::Extract(task.document_path.clone()));
    if let Some(delay) = self.extract_delay {
      let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
      tokio::time::sleep(delay).await;
      self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
    if self.hanging.contains(&task.document_path) {
      tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    if let Some(message) = self.failing.get(&task.document_path) {
      return Err(ActivityError::failed(message.clone()));
    }
    if self.flaky.lock().unwrap().remove(&task.document_path) {
      return Err(ActivityError::failed("backend hiccup"));
    }
    let results = self
      .results
      .get(&task.document_path)
      .cloned()
      .unwrap_or_default();
    Ok(ExtractionOutcome::new(results))
  }
}

#[async_trait]
impl Aggregate for Script {
  async fn aggregate(
    &self,
    request: &AggregationRequest,
  ) -> Result<AggregationResult, ActivityError> {
    self.record(Call::Aggregate(request.result_paths.clone()));
    let remaining = self.aggregate_failures.load(Ordering::SeqCst);
    if remaining > 0 {
      self.aggregate_failures.store(remaining - 1, Ordering::SeqCst);
      return Err(ActivityError::failed("store busy"));
    }
    match &self.aggregate_error {
      Some(ActivityError::InvalidInput { message }) => Err(ActivityError::invalid_input(message)),
      Some(other) => Err(ActivityError::failed(other.to_string())),
      None => Ok(AggregationResult::new(
        request
          .result_paths
          .iter()
          .map(|path| format!("ref:{path}"))
          .collect(),
      )),
    }
  }
}

#[async_trait]
impl Cleanup for Script {
  async fn cleanup(&self, request: &CleanupRequest) -> Result<(), ActivityError> {
    self.record(Call::Cleanup(request.document_paths.clone()));
    match &self.cleanup_error {
      Some(message) => Err(ActivityError::failed(message.clone())),
      None => Ok(()),
    }
  }
}

pub fn activities(script: &Arc<Script>) -> Activities {
  Activities::new(
    script.clone(),
    script.clone(),
    script.clone(),
    script.clone(),
  )
}

/// Three attempts, no backoff, short timeouts.
pub fn fast_config() -> EngineConfig {
  EngineConfig {
    retry: RetryPolicy::immediate(3),
    timeouts: StepTimeouts {
      discover_ms: 1_000,
      extract_ms: 1_000,
      aggregate_ms: 1_000,
      cleanup_ms: 1_000,
    },
  }
}

pub fn request(upload_id: &str) -> WorkflowRequest {
  WorkflowRequest::new(
    upload_id,
    "user-1",
    Credential::new("sk-test"),
    ExtractionModel::Gpt4oMini,
  )
}
