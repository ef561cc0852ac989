//! Flattened, linked form of a built tree.
//!
//! A [`Plan`] is what leaves the core: one record per node, with parent and
//! child linkage, the completion policy of every process and the activation
//! payload of every task. An external store can persist it next to per-node
//! states and rebuild the state machine after a crash.

use std::collections::{HashMap, HashSet};

use cadence_config::{Arguments, CompletionPolicy, Options};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::node::{Node, Process, ProcessKind, Task, TaskKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordering {
  Sequential,
  Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskVariant {
  Step,
  Job,
  SubProcess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanNodeKind {
  Process {
    ordering: Ordering,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy: Option<CompletionPolicy>,
    children: Vec<String>,
  },
  Task {
    variant: TaskVariant,
    /// Step method, job name, or the definition of the wrapped process.
    target: String,
    #[serde(default)]
    args: Arguments,
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    options: Options,
    /// Sub-process tasks link to the root of the wrapped process.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<String>,
  },
}

/// One flattened node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
  pub node_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<String>,
  /// Index among the parent's children.
  pub position: usize,
  /// Description the node executes against.
  pub definition: String,
  #[serde(flatten)]
  pub kind: PlanNodeKind,
}

impl PlanNode {
  pub fn children(&self) -> &[String] {
    match &self.kind {
      PlanNodeKind::Process { children, .. } | PlanNodeKind::Task { children, .. } => children,
    }
  }

  pub fn is_task(&self) -> bool {
    matches!(self.kind, PlanNodeKind::Task { .. })
  }
}

/// Every node of a tree, in depth-first pre-order (root first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
  pub root_id: String,
  pub nodes: Vec<PlanNode>,
}

impl Plan {
  pub fn new(root: &Process) -> Self {
    let mut nodes = Vec::new();
    flatten_process(root, None, 0, &mut nodes);
    Self {
      root_id: root.id.clone(),
      nodes,
    }
  }

  pub fn get(&self, node_id: &str) -> Option<&PlanNode> {
    self.nodes.iter().find(|node| node.node_id == node_id)
  }

  pub fn root(&self) -> Option<&PlanNode> {
    self.get(&self.root_id)
  }

  /// Map of node id to index in [`Plan::nodes`].
  pub fn index(&self) -> HashMap<&str, usize> {
    self
      .nodes
      .iter()
      .enumerate()
      .map(|(i, node)| (node.node_id.as_str(), i))
      .collect()
  }

  /// Check ids are unique and every link points at a known node.
  pub fn validate(&self) -> Result<(), WorkflowError> {
    let mut seen = HashSet::new();
    for node in &self.nodes {
      if !seen.insert(node.node_id.as_str()) {
        return Err(WorkflowError::DuplicateNode(node.node_id.clone()));
      }
    }

    if !seen.contains(self.root_id.as_str()) {
      return Err(WorkflowError::NodeNotFound(self.root_id.clone()));
    }

    for node in &self.nodes {
      for child in node.children() {
        if !seen.contains(child.as_str()) {
          return Err(WorkflowError::InvalidLinkage {
            parent: node.node_id.clone(),
            child: child.clone(),
          });
        }
      }
    }

    Ok(())
  }
}

fn flatten_process(
  process: &Process,
  parent_id: Option<&str>,
  position: usize,
  nodes: &mut Vec<PlanNode>,
) {
  let (ordering, policy) = match process.kind {
    ProcessKind::Sequential => (Ordering::Sequential, None),
    ProcessKind::Concurrent { policy } => (Ordering::Concurrent, Some(policy)),
  };

  nodes.push(PlanNode {
    node_id: process.id.clone(),
    parent_id: parent_id.map(str::to_string),
    position,
    definition: process.definition.clone(),
    kind: PlanNodeKind::Process {
      ordering,
      policy,
      children: process.children.iter().map(|c| c.id().to_string()).collect(),
    },
  });

  for (i, child) in process.children.iter().enumerate() {
    match child {
      Node::Process(child) => flatten_process(child, Some(&process.id), i, nodes),
      Node::Task(task) => flatten_task(task, &process.definition, &process.id, i, nodes),
    }
  }
}

fn flatten_task(
  task: &Task,
  definition: &str,
  parent_id: &str,
  position: usize,
  nodes: &mut Vec<PlanNode>,
) {
  let (variant, target, args, children) = match &task.kind {
    TaskKind::Step { method, args } => (TaskVariant::Step, method.clone(), args.clone(), vec![]),
    TaskKind::Job { job, args } => (
      TaskVariant::Job,
      job.name().to_string(),
      args.clone(),
      vec![],
    ),
    TaskKind::SubProcess { process } => (
      TaskVariant::SubProcess,
      process.definition.clone(),
      Arguments::default(),
      vec![process.id.clone()],
    ),
  };

  nodes.push(PlanNode {
    node_id: task.id.clone(),
    parent_id: Some(parent_id.to_string()),
    position,
    definition: definition.to_string(),
    kind: PlanNodeKind::Task {
      variant,
      target,
      args,
      options: task.options.clone(),
      children,
    },
  });

  if let TaskKind::SubProcess { process } = &task.kind {
    flatten_process(process, Some(&task.id), 0, nodes);
  }
}
