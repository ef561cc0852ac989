//! Compiler from declarative blocks to process trees.
//!
//! A builder is bound to one enclosing [`Process`] and appends children to
//! it. Nested processes are built by child builders sharing the description
//! and arguments of their parent.

use cadence_config::{Arguments, CompletionPolicy, Options, Value};
use cadence_workflow::{JobRef, Process, Task};
use tracing::debug;

use crate::description::WorkflowDescription;
use crate::error::DefinitionError;
use crate::executor::Executor;

/// A block that is a plain function rather than a closure.
pub type BlockFn = fn(&mut Builder<'_>) -> Result<(), DefinitionError>;

/// An absent block, for operations that take `Option<F>`.
pub const NO_BLOCK: Option<BlockFn> = None;

fn is_blank(identifier: &str) -> bool {
  identifier.trim().is_empty()
}

pub struct Builder<'a> {
  process: &'a mut Process,
  executor: Executor<'a>,
  arguments: Arguments,
}

impl<'a> Builder<'a> {
  pub fn new(
    process: &'a mut Process,
    description: &'a dyn WorkflowDescription,
    arguments: Arguments,
  ) -> Self {
    Self {
      process,
      executor: Executor::new(description),
      arguments,
    }
  }

  /// Build from a loose argument list whose trailing JSON object, if any, is
  /// the options map.
  pub fn from_values(
    process: &'a mut Process,
    description: &'a dyn WorkflowDescription,
    values: Vec<Value>,
  ) -> Self {
    Self::new(process, description, Arguments::from_values(values))
  }

  pub fn process(&self) -> &Process {
    &*self.process
  }

  pub fn definition(&self) -> &'a dyn WorkflowDescription {
    self.executor.description()
  }

  pub fn args(&self) -> &[Value] {
    &self.arguments.args
  }

  pub fn options(&self) -> &Options {
    &self.arguments.options
  }

  pub fn arguments(&self) -> &Arguments {
    &self.arguments
  }

  /// Evaluate `block` against this builder iff `key` is set in the options.
  pub fn option<F>(&mut self, key: &str, block: F) -> Result<(), DefinitionError>
  where
    F: Fn(&mut Builder<'_>) -> Result<(), DefinitionError>,
  {
    if self.arguments.options.is_set(key) {
      block(self)
    } else {
      Ok(())
    }
  }

  /// Append a sequential process defined by `block`.
  pub fn sequential<F>(&mut self, options: Options, block: Option<F>) -> Result<(), DefinitionError>
  where
    F: Fn(&mut Builder<'_>) -> Result<(), DefinitionError>,
  {
    let block = block.ok_or(DefinitionError::MissingBlock {
      operation: "sequential",
    })?;
    let process = Process::sequential(self.definition().name(), options);
    self.append_process(process, block)
  }

  /// Append a concurrent process defined by `block`, joined under `policy`.
  pub fn concurrent<F>(
    &mut self,
    policy: CompletionPolicy,
    options: Options,
    block: Option<F>,
  ) -> Result<(), DefinitionError>
  where
    F: Fn(&mut Builder<'_>) -> Result<(), DefinitionError>,
  {
    let block = block.ok_or(DefinitionError::MissingBlock {
      operation: "concurrent",
    })?;
    let process = Process::concurrent(self.definition().name(), policy, options);
    self.append_process(process, block)
  }

  fn append_process<F>(&mut self, mut process: Process, block: F) -> Result<(), DefinitionError>
  where
    F: Fn(&mut Builder<'_>) -> Result<(), DefinitionError>,
  {
    {
      let mut builder = Builder::new(&mut process, self.definition(), self.arguments.clone());
      block(&mut builder)?;
    }

    debug!(
      definition = %process.definition,
      process_id = %process.id,
      kind = ?process.kind,
      children = process.len(),
      "process defined"
    );
    self.process.push(process);
    Ok(())
  }

  /// Append a step task invoking `method` with the captured arguments.
  pub fn task(&mut self, method: &str, options: Options) -> Result<(), DefinitionError> {
    if is_blank(method) {
      return Err(DefinitionError::InvalidArgument {
        operation: "task",
        message: "task method is required".to_string(),
      });
    }
    if !self.executor.resolves(method) {
      return Err(self.unresolved(method));
    }

    let task = Task::step(method, self.arguments.clone(), options);
    debug!(task_id = %task.id, identifier = %method, "step task defined");
    self.process.push(task);
    Ok(())
  }

  /// Append a job task handing `job` the captured arguments.
  pub fn job(&mut self, job: JobRef, options: Options) -> Result<(), DefinitionError> {
    if job.is_absent() {
      return Err(DefinitionError::InvalidArgument {
        operation: "job",
        message: "job object is required".to_string(),
      });
    }
    if !self.executor.is_job(&job) {
      return Err(DefinitionError::InvalidArgument {
        operation: "job",
        message: format!("'{}' does not have a perform entry point", job),
      });
    }

    let task = Task::job(job, self.arguments.clone(), options);
    debug!(task_id = %task.id, "job task defined");
    self.process.push(task);
    Ok(())
  }

  /// Evaluate `block` once per item produced by `iterator`, each time against
  /// a builder on the same enclosing process whose arguments are the item.
  pub fn for_each<F>(
    &mut self,
    iterator: &str,
    options: Options,
    block: Option<F>,
  ) -> Result<(), DefinitionError>
  where
    F: Fn(&mut Builder<'_>) -> Result<(), DefinitionError>,
  {
    if is_blank(iterator) {
      return Err(DefinitionError::MissingArgument {
        operation: "for_each",
        argument: "iterator",
      });
    }
    let block = block.ok_or(DefinitionError::MissingArgument {
      operation: "for_each",
      argument: "block",
    })?;
    if !self.executor.resolves(iterator) {
      return Err(self.unresolved(iterator));
    }

    let arguments = if options.is_empty() {
      self.arguments.clone()
    } else {
      Arguments::new(
        self.arguments.args.clone(),
        self.arguments.options.merged(&options),
      )
    };

    let executor = self.executor;
    let description = executor.description();
    let appended_from = self.process.len();
    let process = &mut *self.process;
    let mut items = 0usize;

    let expanded = executor.iterate(iterator, &arguments, &mut |item| {
      let mut builder = Builder::new(&mut *process, description, item);
      block(&mut builder)?;
      items += 1;
      Ok(())
    });
    if let Err(e) = expanded {
      // drop the nodes of items that were built before the failure
      self.process.children.truncate(appended_from);
      return Err(e);
    }

    debug!(identifier = %iterator, items, "fan-out expanded");
    Ok(())
  }

  /// Append a sub-process task wrapping the process `other` builds from the
  /// captured arguments.
  pub fn sub_process(
    &mut self,
    other: &dyn WorkflowDescription,
    options: Options,
  ) -> Result<(), DefinitionError> {
    let process = other.build_process(self.arguments.clone())?;
    let task = Task::sub_process(process, options);
    debug!(
      task_id = %task.id,
      sub_definition = %other.name(),
      "sub-process task defined"
    );
    self.process.push(task);
    Ok(())
  }

  fn unresolved(&self, identifier: &str) -> DefinitionError {
    DefinitionError::UnresolvedBehavior {
      definition: self.definition().name().to_string(),
      identifier: identifier.to_string(),
    }
  }
}

impl std::fmt::Debug for Builder<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Builder")
      .field("process", &self.process.id)
      .field("executor", &self.executor)
      .field("arguments", &self.arguments)
      .finish()
  }
}
