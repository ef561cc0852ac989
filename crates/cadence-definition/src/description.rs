use std::sync::Arc;

use cadence_config::Arguments;
use cadence_workflow::{JobRef, Process};

use crate::error::DefinitionError;

/// Per-item callback handed to an iterator behavior.
pub type ItemSink<'a> = dyn FnMut(Arguments) -> Result<(), DefinitionError> + 'a;

/// A job object: something with a single `perform` entry point that the
/// dispatcher runs out of process.
pub trait Job: Send + Sync {
  /// Name the job is referenced by in built trees.
  fn name(&self) -> &str;

  fn perform(&self, args: &Arguments) -> anyhow::Result<()>;
}

/// The capability set a builder and the runtime call into.
///
/// Implementations adapt author code: they answer whether an identifier
/// names a behavior, invoke it, recognise job objects, and build their own
/// process when used as a sub-process.
pub trait WorkflowDescription: Send + Sync {
  fn name(&self) -> &str;

  /// True iff `identifier` names a step or iterator behavior.
  fn resolves(&self, identifier: &str) -> bool;

  /// Invoke a step behavior.
  fn invoke(&self, identifier: &str, args: &Arguments) -> anyhow::Result<()>;

  /// Invoke an iterator behavior, calling `sink` once per produced item in
  /// production order before returning.
  fn iterate(
    &self,
    identifier: &str,
    args: &Arguments,
    sink: &mut ItemSink<'_>,
  ) -> Result<(), DefinitionError>;

  /// True iff `job` names an object with a `perform` entry point.
  fn is_job(&self, job: &JobRef) -> bool;

  fn job(&self, job: &JobRef) -> Option<Arc<dyn Job>>;

  /// Build an independent process tree from `args`.
  fn build_process(&self, args: Arguments) -> Result<Process, DefinitionError>;
}
