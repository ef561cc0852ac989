//! Execution events and notifiers.
//!
//! The runtime emits an event for every state change it applies so consumers
//! can persist progress or stream it elsewhere.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::state::{NodeState, StateChange};

/// Events emitted while an execution runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  ProcessStarted {
    execution_id: String,
    process_id: String,
    definition: String,
  },

  /// A node moved to `Active`.
  NodeActivated {
    execution_id: String,
    node_id: String,
  },

  NodeCompleted {
    execution_id: String,
    node_id: String,
  },

  NodeFailed {
    execution_id: String,
    node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
  },

  /// The root process completed.
  ProcessCompleted { execution_id: String },

  /// The root process failed.
  ProcessFailed { execution_id: String },
}

impl ExecutionEvent {
  pub(crate) fn from_change(execution_id: &str, change: &StateChange) -> Option<Self> {
    let execution_id = execution_id.to_string();
    let node_id = change.node_id.clone();
    match change.state {
      NodeState::Pending => None,
      NodeState::Active => Some(ExecutionEvent::NodeActivated {
        execution_id,
        node_id,
      }),
      NodeState::Completed => Some(ExecutionEvent::NodeCompleted {
        execution_id,
        node_id,
      }),
      NodeState::Failed => Some(ExecutionEvent::NodeFailed {
        execution_id,
        node_id,
        error: change.error.clone(),
      }),
    }
  }
}

/// Receives execution events.
///
/// `notify` is called from the driver loop, so implementations should not
/// block.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // unbounded so a slow consumer never stalls report handling
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
