//! Completion state machine for one execution of a plan.
//!
//! Node states live behind a single mutex, so terminal reports arriving from
//! parallel workers are applied one at a time. Each report either changes the
//! state of its task, and possibly of its ancestors, or is ignored.

use std::collections::HashMap;
use std::sync::Mutex;

use cadence_config::CompletionPolicy;
use cadence_workflow::{Ordering, Plan, PlanNode, PlanNodeKind, TaskVariant};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RuntimeError;
use crate::state::{Activation, NodeState, Outcome, Progress, StateChange, Transition};

/// Node states of an execution, keyed by node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub execution_id: String,
  pub states: HashMap<String, NodeState>,
}

pub struct Execution {
  execution_id: String,
  plan: Plan,
  index: HashMap<String, usize>,
  parents: Vec<Option<usize>>,
  children: Vec<Vec<usize>>,
  states: Mutex<Vec<NodeState>>,
}

impl Execution {
  pub fn new(execution_id: impl Into<String>, plan: Plan) -> Result<Self, RuntimeError> {
    plan.validate()?;

    let index: HashMap<String, usize> = plan
      .index()
      .into_iter()
      .map(|(id, i)| (id.to_string(), i))
      .collect();

    let mut parents = vec![None; plan.nodes.len()];
    let mut children = Vec::with_capacity(plan.nodes.len());
    for (i, node) in plan.nodes.iter().enumerate() {
      let linked: Vec<usize> = node.children().iter().map(|id| index[id.as_str()]).collect();
      for &child in &linked {
        parents[child] = Some(i);
      }
      children.push(linked);
    }

    let states = Mutex::new(vec![NodeState::Pending; plan.nodes.len()]);

    Ok(Self {
      execution_id: execution_id.into(),
      plan,
      index,
      parents,
      children,
      states,
    })
  }

  /// Rebuild an execution from a persisted plan and snapshot.
  ///
  /// Nodes missing from the snapshot are pending.
  pub fn restore(plan: Plan, snapshot: Snapshot) -> Result<Self, RuntimeError> {
    let execution = Self::new(snapshot.execution_id, plan)?;
    {
      let mut states = execution.states.lock().unwrap();
      for (node_id, state) in snapshot.states {
        let i = execution.position(&node_id)?;
        states[i] = state;
      }
    }
    Ok(execution)
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn plan(&self) -> &Plan {
    &self.plan
  }

  pub fn root_id(&self) -> &str {
    &self.plan.root_id
  }

  pub fn state(&self, node_id: &str) -> Result<NodeState, RuntimeError> {
    let i = self.position(node_id)?;
    Ok(self.states.lock().unwrap()[i])
  }

  pub fn root_state(&self) -> NodeState {
    self.states.lock().unwrap()[self.root()]
  }

  pub fn is_finished(&self) -> bool {
    self.root_state().is_terminal()
  }

  pub fn snapshot(&self) -> Snapshot {
    let states = self.states.lock().unwrap();
    Snapshot {
      execution_id: self.execution_id.clone(),
      states: self
        .plan
        .nodes
        .iter()
        .zip(states.iter())
        .map(|(node, state)| (node.node_id.clone(), *state))
        .collect(),
    }
  }

  /// Step and job tasks that are active and still waiting for a report.
  pub fn pending_activations(&self) -> Vec<Activation> {
    let states = self.states.lock().unwrap();
    (0..self.plan.nodes.len())
      .filter(|&i| states[i] == NodeState::Active && self.is_leaf_task(i))
      .filter_map(|i| self.activation(i))
      .collect()
  }

  /// Activate the root process.
  pub fn start(&self) -> Progress {
    let mut states = self.states.lock().unwrap();
    let mut progress = Progress::default();
    self.activate(&mut states, self.root(), &mut progress);
    progress
  }

  /// Record the terminal state of an active step or job task.
  ///
  /// Reports for tasks that are not active (already terminal, never
  /// activated, or not a step/job) are ignored, so redelivery is harmless.
  pub fn report(&self, node_id: &str, outcome: Outcome) -> Result<Transition, RuntimeError> {
    let i = self.position(node_id)?;
    let mut states = self.states.lock().unwrap();

    if !self.is_leaf_task(i) || states[i] != NodeState::Active {
      debug!(
        execution_id = %self.execution_id,
        node_id = %node_id,
        state = %states[i],
        "ignoring report"
      );
      return Ok(Transition::Ignored);
    }

    let mut progress = Progress::default();
    let error = match &outcome {
      Outcome::Completed => None,
      Outcome::Failed(error) => Some(error.clone()),
    };
    self.finish(&mut states, i, outcome.state(), error, &mut progress);
    Ok(Transition::Applied(progress))
  }

  fn root(&self) -> usize {
    self.index[self.plan.root_id.as_str()]
  }

  fn position(&self, node_id: &str) -> Result<usize, RuntimeError> {
    self
      .index
      .get(node_id)
      .copied()
      .ok_or_else(|| RuntimeError::UnknownNode {
        node_id: node_id.to_string(),
      })
  }

  fn node(&self, i: usize) -> &PlanNode {
    &self.plan.nodes[i]
  }

  fn is_leaf_task(&self, i: usize) -> bool {
    matches!(
      self.node(i).kind,
      PlanNodeKind::Task {
        variant: TaskVariant::Step | TaskVariant::Job,
        ..
      }
    )
  }

  fn activation(&self, i: usize) -> Option<Activation> {
    let node = self.node(i);
    match &node.kind {
      PlanNodeKind::Task {
        variant,
        target,
        args,
        options,
        ..
      } if *variant != TaskVariant::SubProcess => Some(Activation {
        execution_id: self.execution_id.clone(),
        node_id: node.node_id.clone(),
        variant: *variant,
        definition: node.definition.clone(),
        target: target.clone(),
        args: args.clone(),
        options: options.clone(),
      }),
      _ => None,
    }
  }

  fn set(
    &self,
    states: &mut [NodeState],
    i: usize,
    state: NodeState,
    error: Option<String>,
    progress: &mut Progress,
  ) {
    states[i] = state;
    progress.changes.push(StateChange {
      node_id: self.node(i).node_id.clone(),
      state,
      error,
    });
  }

  fn activate(&self, states: &mut [NodeState], i: usize, progress: &mut Progress) {
    if states[i] != NodeState::Pending {
      return;
    }
    self.set(states, i, NodeState::Active, None, progress);

    match &self.node(i).kind {
      PlanNodeKind::Process { ordering, .. } => {
        if self.children[i].is_empty() {
          self.finish(states, i, NodeState::Completed, None, progress);
          return;
        }
        match ordering {
          Ordering::Sequential => self.activate(states, self.children[i][0], progress),
          Ordering::Concurrent => {
            for &child in &self.children[i] {
              // a first-policy process may complete while its children are
              // still being activated
              if states[i] != NodeState::Active {
                break;
              }
              self.activate(states, child, progress);
            }
          }
        }
      }
      PlanNodeKind::Task {
        variant: TaskVariant::SubProcess,
        ..
      } => match self.children[i].first() {
        Some(&process) => self.activate(states, process, progress),
        None => self.finish(states, i, NodeState::Completed, None, progress),
      },
      PlanNodeKind::Task { .. } => {
        if let Some(activation) = self.activation(i) {
          progress.activations.push(activation);
        }
      }
    }
  }

  fn finish(
    &self,
    states: &mut [NodeState],
    i: usize,
    state: NodeState,
    error: Option<String>,
    progress: &mut Progress,
  ) {
    self.set(states, i, state, error, progress);
    if let Some(parent) = self.parents[i] {
      self.child_finished(states, parent, i, progress);
    }
  }

  fn child_finished(
    &self,
    states: &mut [NodeState],
    parent: usize,
    child: usize,
    progress: &mut Progress,
  ) {
    // a terminal parent no longer listens to its children
    if states[parent] != NodeState::Active {
      return;
    }
    let child_state = states[child];

    match &self.node(parent).kind {
      PlanNodeKind::Task { .. } => self.finish(states, parent, child_state, None, progress),
      PlanNodeKind::Process {
        ordering: Ordering::Sequential,
        ..
      } => {
        if child_state == NodeState::Failed {
          self.finish(states, parent, NodeState::Failed, None, progress);
          return;
        }
        let next = self.node(child).position + 1;
        match self.children[parent].get(next) {
          Some(&sibling) => self.activate(states, sibling, progress),
          None => self.finish(states, parent, NodeState::Completed, None, progress),
        }
      }
      PlanNodeKind::Process {
        ordering: Ordering::Concurrent,
        policy,
        ..
      } => match policy.unwrap_or_default() {
        CompletionPolicy::First => self.finish(states, parent, child_state, None, progress),
        CompletionPolicy::All => {
          let siblings = &self.children[parent];
          if siblings.iter().any(|&s| !states[s].is_terminal()) {
            return;
          }
          let failed = siblings.iter().any(|&s| states[s] == NodeState::Failed);
          let state = if failed {
            NodeState::Failed
          } else {
            NodeState::Completed
          };
          self.finish(states, parent, state, None, progress);
        }
      },
    }
  }
}

impl std::fmt::Debug for Execution {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Execution")
      .field("execution_id", &self.execution_id)
      .field("root_id", &self.plan.root_id)
      .field("nodes", &self.plan.nodes.len())
      .finish()
  }
}
