use cadence_config::{Arguments, Options};
use cadence_workflow::TaskVariant;
use serde::{Deserialize, Serialize};

/// Lifecycle of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
  #[default]
  Pending,
  Active,
  Completed,
  Failed,
}

impl NodeState {
  pub fn is_terminal(self) -> bool {
    matches!(self, NodeState::Completed | NodeState::Failed)
  }
}

impl std::fmt::Display for NodeState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      NodeState::Pending => "pending",
      NodeState::Active => "active",
      NodeState::Completed => "completed",
      NodeState::Failed => "failed",
    };
    f.write_str(s)
  }
}

/// Terminal result reported for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum Outcome {
  Completed,
  Failed(String),
}

impl Outcome {
  pub fn state(&self) -> NodeState {
    match self {
      Outcome::Completed => NodeState::Completed,
      Outcome::Failed(_) => NodeState::Failed,
    }
  }
}

/// Request to run one step or job task.
///
/// This is what crosses the dispatch boundary: everything a worker needs to
/// run the task and report back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activation {
  pub execution_id: String,
  pub node_id: String,
  pub variant: TaskVariant,
  /// Description the task resolves against.
  pub definition: String,
  /// Step method or job name.
  pub target: String,
  pub args: Arguments,
  #[serde(default, skip_serializing_if = "Options::is_empty")]
  pub options: Options,
}

/// One node state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
  pub node_id: String,
  pub state: NodeState,
  /// Error carried by the task report that caused a failure, if any.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Everything a transition produced, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
  pub changes: Vec<StateChange>,
  pub activations: Vec<Activation>,
}

impl Progress {
  pub fn is_empty(&self) -> bool {
    self.changes.is_empty() && self.activations.is_empty()
  }

  /// New state of `node_id`, if this progress changed it.
  pub fn state_of(&self, node_id: &str) -> Option<NodeState> {
    self
      .changes
      .iter()
      .rev()
      .find(|change| change.node_id == node_id)
      .map(|change| change.state)
  }
}

/// Result of reporting a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
  Applied(Progress),
  /// Duplicate or out-of-place report; nothing changed.
  Ignored,
}
