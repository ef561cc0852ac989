use std::sync::Arc;

use cadence_config::Arguments;
use cadence_workflow::JobRef;
use tracing::debug;

use crate::description::{ItemSink, Job, WorkflowDescription};
use crate::error::DefinitionError;

/// Execution context bound to one description.
///
/// Holds a reference to the description and forwards every call to it; it
/// owns nothing else, so rebinding is just building a new executor.
#[derive(Clone, Copy)]
pub struct Executor<'a> {
  description: &'a dyn WorkflowDescription,
}

impl<'a> Executor<'a> {
  pub fn new(description: &'a dyn WorkflowDescription) -> Self {
    Self { description }
  }

  pub fn description(&self) -> &'a dyn WorkflowDescription {
    self.description
  }

  pub fn resolves(&self, identifier: &str) -> bool {
    self.description.resolves(identifier)
  }

  pub fn invoke_step(&self, method: &str, args: &Arguments) -> anyhow::Result<()> {
    debug!(
      definition = %self.description.name(),
      identifier = %method,
      "invoking step"
    );
    self.description.invoke(method, args)
  }

  pub fn iterate(
    &self,
    iterator: &str,
    args: &Arguments,
    sink: &mut ItemSink<'_>,
  ) -> Result<(), DefinitionError> {
    debug!(
      definition = %self.description.name(),
      identifier = %iterator,
      "invoking iterator"
    );
    self.description.iterate(iterator, args, sink)
  }

  pub fn is_job(&self, job: &JobRef) -> bool {
    self.description.is_job(job)
  }

  pub fn job(&self, job: &JobRef) -> Option<Arc<dyn Job>> {
    self.description.job(job)
  }
}

impl std::fmt::Debug for Executor<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Executor")
      .field("description", &self.description.name())
      .finish()
  }
}
