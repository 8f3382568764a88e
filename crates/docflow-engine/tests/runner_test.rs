mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Call, Script, activities, fast_config, request};
use docflow_engine::{ChannelNotifier, IngestWorkflow, RunEvent, RunnerError, WorkflowRunner};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn runner(script: &Arc<Script>, max_concurrent_runs: usize) -> WorkflowRunner {
  let workflow = Arc::new(IngestWorkflow::new(activities(script), fast_config()));
  WorkflowRunner::new(workflow, max_concurrent_runs)
}

#[tokio::test]
async fn test_submitted_runs_complete() {
  let script = Arc::new(Script::with_documents(&[("a.pdf", &["a.json"])]));
  let runner = runner(&script, 2);
  let handle = runner.handle();
  let cancel = CancellationToken::new();
  let loop_task = tokio::spawn(runner.start(cancel.clone()));

  let (first, second, third) = tokio::join!(
    handle.submit(request("upload-1")),
    handle.submit(request("upload-2")),
    handle.submit(request("upload-3")),
  );

  for result in [first, second, third] {
    let result = result.unwrap();
    assert!(result.succeeded);
    assert_eq!(result.refs, vec!["ref:a.json"]);
  }
  assert_eq!(script.count(|c| matches!(c, Call::Cleanup(_))), 3);

  cancel.cancel();
  loop_task.await.unwrap();
}

#[tokio::test]
async fn test_runner_stops_when_handles_dropped() {
  let script = Arc::new(Script::default());
  let runner = runner(&script, 1);
  let handle = runner.handle();
  let loop_task = tokio::spawn(runner.start(CancellationToken::new()));

  let result = handle.submit(request("upload-1")).await.unwrap();
  assert!(result.succeeded);

  drop(handle);
  tokio::time::timeout(Duration::from_secs(5), loop_task)
    .await
    .expect("runner should stop once every handle is gone")
    .unwrap();
}

#[tokio::test]
async fn test_cancelling_runner_cancels_runs_but_cleans_up() {
  let mut script = Script::with_documents(&[("a.pdf", &["a.json"])]);
  script.hanging.insert("a.pdf".to_string());
  let script = Arc::new(script);
  let mut config = fast_config();
  config.timeouts.extract_ms = 60_000;
  let workflow = Arc::new(IngestWorkflow::new(activities(&script), config));
  let runner = WorkflowRunner::new(workflow, 1);
  let handle = runner.handle();
  let cancel = CancellationToken::new();
  let loop_task = tokio::spawn(runner.start(cancel.clone()));

  let pending = tokio::spawn({
    let handle = handle.clone();
    async move { handle.submit(request("upload-1")).await }
  });
  tokio::time::sleep(Duration::from_millis(50)).await;
  cancel.cancel();

  let result = pending.await.unwrap().unwrap();
  assert!(!result.succeeded);
  assert_eq!(result.errors, vec!["extraction failed: run cancelled".to_string()]);
  assert_eq!(
    script.calls().last(),
    Some(&Call::Cleanup(vec!["a.pdf".to_string()]))
  );

  loop_task.await.unwrap();
  assert!(matches!(
    handle.submit(request("upload-2")).await,
    Err(RunnerError::Closed)
  ));
}

#[tokio::test]
async fn test_execute_once() {
  let script = Arc::new(Script::with_documents(&[("a.pdf", &["a.json"])]));
  let runner = runner(&script, 1);

  let result = runner
    .execute_once(request("upload-1"), CancellationToken::new())
    .await;

  assert!(result.succeeded);
  assert_eq!(result.refs, vec!["ref:a.json"]);
}

#[tokio::test]
async fn test_submit_with_id_uses_given_run_id() {
  let script = Arc::new(Script::with_documents(&[("a.pdf", &["a.json"])]));
  let (tx, mut rx) = mpsc::unbounded_channel();
  let workflow = Arc::new(IngestWorkflow::with_notifier(
    activities(&script),
    fast_config(),
    ChannelNotifier::new(tx),
  ));
  let runner = WorkflowRunner::new(workflow, 2);
  let handle = runner.handle();
  let loop_task = tokio::spawn(runner.start(CancellationToken::new()));

  let result = handle
    .submit_with_id("run-7", request("upload-1"))
    .await
    .unwrap();
  assert!(result.succeeded);

  drop(handle);
  loop_task.await.unwrap();

  let mut run_ids = Vec::new();
  while let Ok(event) = rx.try_recv() {
    if let RunEvent::RunStarted { run_id, .. } = event {
      run_ids.push(run_id);
    }
  }
  assert_eq!(run_ids, vec!["run-7"]);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
  let mut script = Script::with_documents(&[("a.pdf", &["a.json"])]);
  script.extract_delay = Some(Duration::from_millis(50));
  let script = Arc::new(script);
  let runner = runner(&script, 2);
  let handle = runner.handle();
  let loop_task = tokio::spawn(runner.start(CancellationToken::new()));

  let submissions: Vec<_> = (0..5)
    .map(|i| {
      let handle = handle.clone();
      tokio::spawn(async move { handle.submit(request(&format!("upload-{i}"))).await })
    })
    .collect();
  for submission in submissions {
    assert!(submission.await.unwrap().unwrap().succeeded);
  }

  assert_eq!(script.max_in_flight(), 2);

  drop(handle);
  loop_task.await.unwrap();
}
