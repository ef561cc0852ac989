//! Cadence Runtime
//!
//! Executes built process trees.
//!
//! # Architecture
//!
//! ```text
//! Runtime (async driver)
//! ├── Execution              completion state machine over a flattened Plan
//! │   ├── start              activates the root process
//! │   ├── report             applies one terminal report, serialized by a mutex
//! │   └── snapshot/restore   node states for an external store
//! ├── steps                  invoked on the blocking pool through an Executor
//! ├── JobDispatcher          jobs leave here; reports come back on a ReportSender
//! │   └── LocalJobDispatcher tokio tasks bounded by a semaphore
//! └── ExecutionNotifier      ExecutionEvent per state change
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let registry = DescriptionRegistry::new().with(orders);
//! let process = registry.get("orders").unwrap().build_process(args)?;
//!
//! let runtime = Runtime::new(registry, RuntimeConfig::default());
//! let result = runtime.run(&process, CancellationToken::new()).await?;
//! assert!(result.is_completed());
//! ```

mod dispatch;
mod error;
mod events;
mod execution;
mod runtime;
mod state;

pub use dispatch::{JobDispatcher, LocalJobDispatcher, Report, ReportSender};
pub use error::RuntimeError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use execution::{Execution, Snapshot};
pub use runtime::{ExecutionResult, Runtime};
pub use state::{Activation, NodeState, Outcome, Progress, StateChange, Transition};
