use thiserror::Error;

/// Errors raised while building a process tree.
///
/// All of them abort the build; no partially built tree is returned.
#[derive(Debug, Error)]
pub enum DefinitionError {
  #[error("{operation}: missing {argument}")]
  MissingArgument {
    operation: &'static str,
    argument: &'static str,
  },

  #[error("{operation}: {message}")]
  InvalidArgument {
    operation: &'static str,
    message: String,
  },

  #[error("'{identifier}' is not defined by '{definition}'")]
  UnresolvedBehavior {
    definition: String,
    identifier: String,
  },

  #[error("{operation} requires a block")]
  MissingBlock { operation: &'static str },

  #[error("behavior '{identifier}' failed")]
  Behavior {
    identifier: String,
    #[source]
    source: anyhow::Error,
  },
}
