use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("node '{parent}' links to unknown child '{child}'")]
  InvalidLinkage { parent: String, child: String },
}
