use std::collections::HashMap;
use std::sync::Arc;

use cadence_config::Arguments;
use cadence_workflow::{JobRef, Process};
use tracing::info;

use crate::builder::Builder;
use crate::description::{ItemSink, Job, WorkflowDescription};
use crate::error::DefinitionError;

type StepFn = Box<dyn Fn(&Arguments) -> anyhow::Result<()> + Send + Sync>;
type IteratorFn = Box<dyn Fn(&Arguments, &mut Yielder<'_, '_>) -> anyhow::Result<()> + Send + Sync>;
type RootBlock = Box<dyn Fn(&mut Builder<'_>) -> Result<(), DefinitionError> + Send + Sync>;

/// Output handle given to iterator behaviors.
///
/// Each [`Yielder::emit`] call builds the nodes for one item before
/// returning. A build error raised while handling an item is kept and
/// reported as-is once the iterator returns; later emits fail immediately.
pub struct Yielder<'s, 'f> {
  sink: &'s mut ItemSink<'f>,
  error: Option<DefinitionError>,
  emitted: usize,
}

impl Yielder<'_, '_> {
  pub fn emit(&mut self, item: impl Into<Arguments>) -> anyhow::Result<()> {
    if self.error.is_some() {
      anyhow::bail!("iteration aborted by an earlier build error");
    }

    match (self.sink)(item.into()) {
      Ok(()) => {
        self.emitted += 1;
        Ok(())
      }
      Err(e) => {
        let message = e.to_string();
        self.error = Some(e);
        Err(anyhow::anyhow!(message))
      }
    }
  }

  /// Number of items emitted so far.
  pub fn emitted(&self) -> usize {
    self.emitted
  }
}

/// A description assembled from closures and job objects.
///
/// Steps and iterators are registered by name; jobs under their
/// [`Job::name`]. The root block, if any, is what [`build_process`] evaluates.
///
/// [`build_process`]: WorkflowDescription::build_process
pub struct Definition {
  name: String,
  steps: HashMap<String, StepFn>,
  iterators: HashMap<String, IteratorFn>,
  jobs: HashMap<String, Arc<dyn Job>>,
  root: Option<RootBlock>,
}

impl Definition {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      steps: HashMap::new(),
      iterators: HashMap::new(),
      jobs: HashMap::new(),
      root: None,
    }
  }

  pub fn step<F>(mut self, name: impl Into<String>, step: F) -> Self
  where
    F: Fn(&Arguments) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.steps.insert(name.into(), Box::new(step));
    self
  }

  pub fn iterator<F>(mut self, name: impl Into<String>, iterator: F) -> Self
  where
    F: Fn(&Arguments, &mut Yielder<'_, '_>) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.iterators.insert(name.into(), Box::new(iterator));
    self
  }

  pub fn job(mut self, job: impl Job + 'static) -> Self {
    self.jobs.insert(job.name().to_string(), Arc::new(job));
    self
  }

  /// Set the root block evaluated by `build_process`.
  pub fn process<F>(mut self, block: F) -> Self
  where
    F: Fn(&mut Builder<'_>) -> Result<(), DefinitionError> + Send + Sync + 'static,
  {
    self.root = Some(Box::new(block));
    self
  }
}

impl WorkflowDescription for Definition {
  fn name(&self) -> &str {
    &self.name
  }

  fn resolves(&self, identifier: &str) -> bool {
    self.steps.contains_key(identifier) || self.iterators.contains_key(identifier)
  }

  fn invoke(&self, identifier: &str, args: &Arguments) -> anyhow::Result<()> {
    match self.steps.get(identifier) {
      Some(step) => step(args),
      None => anyhow::bail!("step '{}' is not defined by '{}'", identifier, self.name),
    }
  }

  fn iterate(
    &self,
    identifier: &str,
    args: &Arguments,
    sink: &mut ItemSink<'_>,
  ) -> Result<(), DefinitionError> {
    let iterator =
      self
        .iterators
        .get(identifier)
        .ok_or_else(|| DefinitionError::UnresolvedBehavior {
          definition: self.name.clone(),
          identifier: identifier.to_string(),
        })?;

    let mut out = Yielder {
      sink,
      error: None,
      emitted: 0,
    };
    let result = iterator(args, &mut out);

    if let Some(error) = out.error {
      return Err(error);
    }
    result.map_err(|source| DefinitionError::Behavior {
      identifier: identifier.to_string(),
      source,
    })
  }

  fn is_job(&self, job: &JobRef) -> bool {
    self.jobs.contains_key(job.name())
  }

  fn job(&self, job: &JobRef) -> Option<Arc<dyn Job>> {
    self.jobs.get(job.name()).cloned()
  }

  fn build_process(&self, args: Arguments) -> Result<Process, DefinitionError> {
    let root = self.root.as_ref().ok_or(DefinitionError::MissingBlock {
      operation: "build_process",
    })?;

    let mut process = Process::sequential(&self.name, args.options.clone());
    {
      let mut builder = Builder::new(&mut process, self, args);
      root(&mut builder)?;
    }

    info!(
      definition = %self.name,
      process_id = %process.id,
      children = process.len(),
      "process_built"
    );
    Ok(process)
  }
}

impl std::fmt::Debug for Definition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Definition")
      .field("name", &self.name)
      .field("steps", &self.steps.keys().collect::<Vec<_>>())
      .field("iterators", &self.iterators.keys().collect::<Vec<_>>())
      .field("jobs", &self.jobs.keys().collect::<Vec<_>>())
      .field("has_process", &self.root.is_some())
      .finish()
  }
}
