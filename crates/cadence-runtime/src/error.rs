//! Runtime errors.

use cadence_workflow::WorkflowError;

/// Errors that can occur while driving an execution.
///
/// A task that fails is not an error: it is the `Failed` state of its node.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Report or lookup for a node that is not part of the execution.
  #[error("node '{node_id}' not found in execution")]
  UnknownNode { node_id: String },

  /// A node references a description that is not registered.
  #[error("no description registered as '{definition}'")]
  UnknownDefinition { definition: String },

  /// The plan has broken linkage.
  #[error("invalid plan")]
  Plan(#[from] WorkflowError),

  /// The dispatcher refused an activation.
  #[error("dispatch failed for node '{node_id}': {message}")]
  Dispatch { node_id: String, message: String },

  /// A job dispatch task panicked or was aborted.
  #[error("dispatch task failed: {message}")]
  Join { message: String },

  /// Every report sender was dropped before the execution finished.
  #[error("report channel closed")]
  ChannelClosed,

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}
