//! Cadence
//!
//! Workflow orchestration. Author code is described by a
//! [`WorkflowDescription`]; a [`Builder`] compiles its declarative blocks
//! into a tree of sequential and concurrent [`Process`]es whose leaves are
//! step, job and sub-process [`Task`]s; the [`Runtime`] drives that tree to
//! completion.
//!
//! | crate | contents |
//! |-------|----------|
//! | `cadence-config` | arguments, options, completion policies, runtime settings |
//! | `cadence-workflow` | process trees and their flattened plan |
//! | `cadence-definition` | descriptions, the executor, and the builder |
//! | `cadence-runtime` | the completion state machine, job dispatch, and the async driver |

pub use cadence_config::{Arguments, CompletionPolicy, Options, RuntimeConfig, Value};
pub use cadence_definition::{
  BlockFn, Builder, Definition, DefinitionError, DescriptionRegistry, Executor, ItemSink, Job,
  NO_BLOCK, WorkflowDescription, Yielder,
};
pub use cadence_runtime::{
  Activation, ChannelNotifier, Execution, ExecutionEvent, ExecutionNotifier, ExecutionResult,
  JobDispatcher, LocalJobDispatcher, NodeState, NoopNotifier, Outcome, Progress, Report,
  ReportSender, Runtime, RuntimeError, Snapshot, StateChange, Transition,
};
pub use cadence_workflow::{
  JobRef, Node, Ordering, Plan, PlanNode, PlanNodeKind, Process, ProcessKind, Task, TaskKind,
  TaskVariant, WorkflowError,
};
