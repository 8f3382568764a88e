//! Docflow Engine
//!
//! This crate sequences the ingestion steps of a run and exposes a
//! [`WorkflowRunner`] for executing many runs concurrently.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowRunner                         │
//! │  - owns mpsc channel of submissions                         │
//! │  - start(cancel) spawns one task per run, bounded           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     IngestWorkflow                          │
//! │  - run(request, cancel) → WorkflowResult (never errors)     │
//! │  - discover → extract each document → aggregate             │
//! │  - cleanup always, exactly once                             │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       StepPolicy                            │
//! │  - bounded retries with backoff, per-step timeouts          │
//! │  - calls Discover / Extract / Aggregate / Cleanup           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use docflow_engine::{EngineConfig, IngestWorkflow};
//! use tokio_util::sync::CancellationToken;
//!
//! let workflow = IngestWorkflow::new(activities, EngineConfig::default());
//! let result = workflow.run(request, CancellationToken::new()).await;
//! println!("{}", serde_json::to_string(&result)?);
//! ```

mod error;
mod events;
mod runner;
mod step;
mod workflow;

pub use error::{RunnerError, StepError};
pub use events::{ChannelNotifier, NoopNotifier, RunEvent, RunNotifier};
pub use runner::{RunnerHandle, WorkflowRunner};
pub use workflow::{EngineConfig, IngestWorkflow};
