//! Async driver.

use std::collections::HashMap;
use std::sync::Arc;

use cadence_config::RuntimeConfig;
use cadence_definition::{DescriptionRegistry, Executor};
use cadence_workflow::{Plan, Process, TaskVariant};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::dispatch::{JobDispatcher, LocalJobDispatcher, ReportSender};
use crate::error::RuntimeError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::execution::Execution;
use crate::state::{Activation, NodeState, Outcome, Progress, Transition};

/// Final state of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
  pub execution_id: String,
  /// Terminal state of the root process.
  pub state: NodeState,
  pub node_states: HashMap<String, NodeState>,
}

impl ExecutionResult {
  pub fn is_completed(&self) -> bool {
    self.state == NodeState::Completed
  }
}

/// Drives built processes to a terminal state.
///
/// Steps run on tokio's blocking pool against the description registered
/// under the node's definition. Jobs go through the [`JobDispatcher`]
/// (a [`LocalJobDispatcher`] unless replaced). Generic over the notifier so
/// events can be observed; `Runtime::new` discards them.
pub struct Runtime<N: ExecutionNotifier = NoopNotifier> {
  registry: Arc<DescriptionRegistry>,
  dispatcher: Arc<dyn JobDispatcher>,
  config: RuntimeConfig,
  notifier: N,
}

impl Runtime<NoopNotifier> {
  pub fn new(registry: DescriptionRegistry, config: RuntimeConfig) -> Self {
    Self::with_notifier(registry, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> Runtime<N> {
  pub fn with_notifier(registry: DescriptionRegistry, config: RuntimeConfig, notifier: N) -> Self {
    let registry = Arc::new(registry);
    let dispatcher = Arc::new(LocalJobDispatcher::new(
      registry.clone(),
      config.max_concurrent_jobs,
    ));

    Self {
      registry,
      dispatcher,
      config,
      notifier,
    }
  }

  /// Replace the job dispatcher.
  pub fn with_dispatcher(mut self, dispatcher: Arc<dyn JobDispatcher>) -> Self {
    self.dispatcher = dispatcher;
    self
  }

  pub fn registry(&self) -> &DescriptionRegistry {
    &self.registry
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  /// Create an execution for `process` without starting it.
  pub fn prepare(&self, process: &Process) -> Result<Execution, RuntimeError> {
    let plan = Plan::new(process);
    for node in &plan.nodes {
      if !self.registry.contains(&node.definition) {
        return Err(RuntimeError::UnknownDefinition {
          definition: node.definition.clone(),
        });
      }
    }
    Execution::new(uuid::Uuid::new_v4().to_string(), plan)
  }

  /// Run `process` until its root is terminal.
  ///
  /// A failed process is not an error: the result carries `Failed`.
  #[instrument(
    name = "process_run",
    skip_all,
    fields(definition = %process.definition, process_id = %process.id)
  )]
  pub async fn run(
    &self,
    process: &Process,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, RuntimeError> {
    let execution = self.prepare(process)?;
    self.resume(&execution, cancel).await
  }

  /// Drive an execution from whatever state it is in.
  ///
  /// A fresh execution is started; a restored one has its pending step and
  /// job activations dispatched again.
  #[instrument(
    name = "execution_drive",
    skip_all,
    fields(execution_id = %execution.execution_id())
  )]
  pub async fn resume(
    &self,
    execution: &Execution,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, RuntimeError> {
    let (sender, mut receiver) = mpsc::channel(self.config.report_buffer_size.max(1));
    let reporter = ReportSender::new(sender);
    // in-flight job dispatches; polled next to the report channel so a
    // dispatcher that reports before returning never stalls the driver
    let mut dispatches = JoinSet::new();

    if execution.root_state() == NodeState::Pending {
      let root = execution.plan().root().ok_or_else(|| RuntimeError::UnknownNode {
        node_id: execution.root_id().to_string(),
      })?;
      info!(
        execution_id = %execution.execution_id(),
        definition = %root.definition,
        nodes = execution.plan().nodes.len(),
        "process_started"
      );
      self.notifier.notify(ExecutionEvent::ProcessStarted {
        execution_id: execution.execution_id().to_string(),
        process_id: root.node_id.clone(),
        definition: root.definition.clone(),
      });

      let progress = execution.start();
      self.apply(execution, progress, &reporter, &mut dispatches);
    } else {
      let pending = execution.pending_activations();
      info!(
        execution_id = %execution.execution_id(),
        pending = pending.len(),
        "process_resumed"
      );
      for activation in pending {
        self.activate(activation, &reporter, &mut dispatches);
      }
    }

    while !execution.is_finished() {
      tokio::select! {
        _ = cancel.cancelled() => {
          warn!(execution_id = %execution.execution_id(), "execution cancelled");
          return Err(RuntimeError::Cancelled);
        }
        Some(joined) = dispatches.join_next() => match joined {
          Ok(dispatched) => dispatched?,
          Err(e) => {
            return Err(RuntimeError::Join {
              message: e.to_string(),
            });
          }
        },
        report = receiver.recv() => {
          let report = report.ok_or(RuntimeError::ChannelClosed)?;
          match execution.report(&report.node_id, report.outcome)? {
            Transition::Applied(progress) => {
              self.apply(execution, progress, &reporter, &mut dispatches)
            }
            Transition::Ignored => {}
          }
        }
      }
    }

    let state = execution.root_state();
    let execution_id = execution.execution_id().to_string();
    if state == NodeState::Completed {
      info!(execution_id = %execution_id, "process_completed");
      self.notifier.notify(ExecutionEvent::ProcessCompleted {
        execution_id: execution_id.clone(),
      });
    } else {
      error!(execution_id = %execution_id, "process_failed");
      self.notifier.notify(ExecutionEvent::ProcessFailed {
        execution_id: execution_id.clone(),
      });
    }

    Ok(ExecutionResult {
      execution_id,
      state,
      node_states: execution.snapshot().states,
    })
  }

  fn apply(
    &self,
    execution: &Execution,
    progress: Progress,
    reporter: &ReportSender,
    dispatches: &mut JoinSet<Result<(), RuntimeError>>,
  ) {
    for change in &progress.changes {
      match change.state {
        NodeState::Completed => {
          debug!(
            execution_id = %execution.execution_id(),
            node_id = %change.node_id,
            "task_completed"
          )
        }
        NodeState::Failed => warn!(
          execution_id = %execution.execution_id(),
          node_id = %change.node_id,
          error = change.error.as_deref().unwrap_or(""),
          "task_failed"
        ),
        _ => {}
      }
      if let Some(event) = ExecutionEvent::from_change(execution.execution_id(), change) {
        self.notifier.notify(event);
      }
    }

    for activation in progress.activations {
      self.activate(activation, reporter, dispatches);
    }
  }

  fn activate(
    &self,
    activation: Activation,
    reporter: &ReportSender,
    dispatches: &mut JoinSet<Result<(), RuntimeError>>,
  ) {
    debug!(
      execution_id = %activation.execution_id,
      node_id = %activation.node_id,
      definition = %activation.definition,
      identifier = %activation.target,
      "task_activated"
    );

    match activation.variant {
      TaskVariant::Job => {
        let dispatcher = self.dispatcher.clone();
        let reporter = reporter.clone();
        dispatches.spawn(async move { dispatcher.dispatch(activation, reporter).await });
      }
      TaskVariant::Step => self.spawn_step(activation, reporter.clone()),
      // sub-process tasks never produce activations
      TaskVariant::SubProcess => {}
    }
  }

  fn spawn_step(&self, activation: Activation, reporter: ReportSender) {
    let description = self.registry.get(&activation.definition);

    tokio::spawn(async move {
      let outcome = match description {
        None => Outcome::Failed(format!(
          "no description registered as '{}'",
          activation.definition
        )),
        Some(description) => {
          let method = activation.target.clone();
          let args = activation.args.clone();
          let result = tokio::task::spawn_blocking(move || {
            Executor::new(description.as_ref()).invoke_step(&method, &args)
          })
          .await;
          match result {
            Ok(Ok(())) => Outcome::Completed,
            Ok(Err(e)) => Outcome::Failed(format!("{:#}", e)),
            Err(e) => Outcome::Failed(format!("step panicked: {}", e)),
          }
        }
      };

      if reporter.send(activation.node_id.clone(), outcome).await.is_err() {
        debug!(
          execution_id = %activation.execution_id,
          node_id = %activation.node_id,
          "execution gone before step report"
        );
      }
    });
  }
}

impl<N: ExecutionNotifier> std::fmt::Debug for Runtime<N> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Runtime")
      .field("registry", &self.registry)
      .field("config", &self.config)
      .finish()
  }
}
