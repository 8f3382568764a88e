use std::sync::Arc;

use async_trait::async_trait;
use docflow_store::Store;
use docflow_task::{AggregationRequest, AggregationResult};
use tracing::debug;

use crate::Aggregate;
use crate::error::ActivityError;

/// Aggregate activity that registers result paths in a [`Store`].
pub struct StoreAggregator<S> {
  store: Arc<S>,
}

impl<S: Store> StoreAggregator<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl<S: Store + 'static> Aggregate for StoreAggregator<S> {
  async fn aggregate(
    &self,
    request: &AggregationRequest,
  ) -> Result<AggregationResult, ActivityError> {
    if request.result_paths.is_empty() {
      debug!(upload_id = %request.upload_id, "nothing to aggregate");
      return Ok(AggregationResult::default());
    }

    let refs = self
      .store
      .register_records(&request.upload_id, &request.user_id, &request.result_paths)
      .await
      .map_err(ActivityError::store)?;

    Ok(AggregationResult::new(refs))
  }
}

#[cfg(test)]
mod tests {
  use docflow_store::SqliteStore;

  use super::*;

  fn request(paths: &[&str]) -> AggregationRequest {
    AggregationRequest {
      upload_id: "upload-1".to_string(),
      user_id: "user-1".to_string(),
      result_paths: paths.iter().map(|p| p.to_string()).collect(),
    }
  }

  #[tokio::test]
  async fn test_empty_request_returns_empty_result() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let aggregator = StoreAggregator::new(store.clone());

    let result = aggregator.aggregate(&request(&[])).await.unwrap();
    assert!(result.refs.is_empty());
    assert!(store.list_records("upload-1", "user-1").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_registers_paths_in_order() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let aggregator = StoreAggregator::new(store.clone());

    let result = aggregator
      .aggregate(&request(&["p1", "p2", "p3"]))
      .await
      .unwrap();
    assert_eq!(result.refs.len(), 3);

    let again = aggregator
      .aggregate(&request(&["p1", "p2", "p3"]))
      .await
      .unwrap();
    assert_eq!(result, again);
  }
}
