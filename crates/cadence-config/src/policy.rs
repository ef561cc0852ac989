use serde::{Deserialize, Serialize};

/// Join rule for a concurrent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
  /// Complete as soon as any child completes.
  First,
  /// Complete only once every child has completed.
  #[default]
  All,
}

impl std::fmt::Display for CompletionPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      CompletionPolicy::First => write!(f, "first"),
      CompletionPolicy::All => write!(f, "all"),
    }
  }
}
