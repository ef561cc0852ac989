use cadence_config::{Arguments, CompletionPolicy, Options};
use serde::{Deserialize, Serialize};

fn new_id() -> String {
  uuid::Uuid::new_v4().to_string()
}

/// Handle of a job object: the name of a type exposing a `perform` entry
/// point. Whether the name really is a job is decided by the description the
/// job is added against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRef(String);

impl JobRef {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn name(&self) -> &str {
    &self.0
  }

  /// A blank name stands for "no job object".
  pub fn is_absent(&self) -> bool {
    self.0.trim().is_empty()
  }
}

impl std::fmt::Display for JobRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// A node of the execution tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
  Process(Process),
  Task(Task),
}

impl Node {
  pub fn id(&self) -> &str {
    match self {
      Node::Process(process) => &process.id,
      Node::Task(task) => &task.id,
    }
  }

  pub fn as_process(&self) -> Option<&Process> {
    match self {
      Node::Process(process) => Some(process),
      Node::Task(_) => None,
    }
  }

  pub fn as_task(&self) -> Option<&Task> {
    match self {
      Node::Task(task) => Some(task),
      Node::Process(_) => None,
    }
  }
}

impl From<Process> for Node {
  fn from(process: Process) -> Self {
    Node::Process(process)
  }
}

impl From<Task> for Node {
  fn from(task: Task) -> Self {
    Node::Task(task)
  }
}

/// Ordering discipline of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessKind {
  /// Children run one at a time, in order.
  Sequential,
  /// Children run independently; completion is decided by `policy`.
  Concurrent { policy: CompletionPolicy },
}

/// A composite node holding ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
  pub id: String,
  /// Name of the description this process was built against. Steps below it
  /// are resolved through that description.
  pub definition: String,
  #[serde(flatten)]
  pub kind: ProcessKind,
  #[serde(default, skip_serializing_if = "Options::is_empty")]
  pub options: Options,
  #[serde(default)]
  pub children: Vec<Node>,
}

impl Process {
  pub fn new(definition: impl Into<String>, kind: ProcessKind, options: Options) -> Self {
    Self {
      id: new_id(),
      definition: definition.into(),
      kind,
      options,
      children: Vec::new(),
    }
  }

  pub fn sequential(definition: impl Into<String>, options: Options) -> Self {
    Self::new(definition, ProcessKind::Sequential, options)
  }

  pub fn concurrent(
    definition: impl Into<String>,
    policy: CompletionPolicy,
    options: Options,
  ) -> Self {
    Self::new(definition, ProcessKind::Concurrent { policy }, options)
  }

  /// Completion policy, for concurrent processes.
  pub fn policy(&self) -> Option<CompletionPolicy> {
    match self.kind {
      ProcessKind::Sequential => None,
      ProcessKind::Concurrent { policy } => Some(policy),
    }
  }

  pub fn push(&mut self, node: impl Into<Node>) {
    self.children.push(node.into());
  }

  pub fn len(&self) -> usize {
    self.children.len()
  }

  pub fn is_empty(&self) -> bool {
    self.children.is_empty()
  }

  /// Depth-first iterator over every task below this process, including the
  /// tasks of wrapped sub-processes.
  pub fn tasks(&self) -> Tasks<'_> {
    Tasks {
      stack: self.children.iter().rev().collect(),
    }
  }
}

/// What a task does when it is activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
  /// Invoke a step behavior of the owning description.
  Step { method: String, args: Arguments },
  /// Hand a job object to the dispatcher for out-of-process execution.
  Job { job: JobRef, args: Arguments },
  /// Run an independently built process as a nested execution.
  SubProcess { process: Box<Process> },
}

/// A leaf node of the execution tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub id: String,
  #[serde(flatten)]
  pub kind: TaskKind,
  #[serde(default, skip_serializing_if = "Options::is_empty")]
  pub options: Options,
}

impl Task {
  pub fn step(method: impl Into<String>, args: Arguments, options: Options) -> Self {
    Self {
      id: new_id(),
      kind: TaskKind::Step {
        method: method.into(),
        args,
      },
      options,
    }
  }

  pub fn job(job: JobRef, args: Arguments, options: Options) -> Self {
    Self {
      id: new_id(),
      kind: TaskKind::Job { job, args },
      options,
    }
  }

  pub fn sub_process(process: Process, options: Options) -> Self {
    Self {
      id: new_id(),
      kind: TaskKind::SubProcess {
        process: Box::new(process),
      },
      options,
    }
  }

  /// Arguments captured at build time. Sub-process tasks carry none.
  pub fn args(&self) -> Option<&Arguments> {
    match &self.kind {
      TaskKind::Step { args, .. } | TaskKind::Job { args, .. } => Some(args),
      TaskKind::SubProcess { .. } => None,
    }
  }
}

/// Iterator returned by [`Process::tasks`].
pub struct Tasks<'a> {
  stack: Vec<&'a Node>,
}

impl<'a> Iterator for Tasks<'a> {
  type Item = &'a Task;

  fn next(&mut self) -> Option<&'a Task> {
    while let Some(node) = self.stack.pop() {
      match node {
        Node::Process(process) => self.stack.extend(process.children.iter().rev()),
        Node::Task(task) => {
          if let TaskKind::SubProcess { process } = &task.kind {
            self.stack.extend(process.children.iter().rev());
          }
          return Some(task);
        }
      }
    }
    None
  }
}
