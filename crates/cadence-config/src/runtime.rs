use serde::{Deserialize, Serialize};

/// Settings for the execution driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
  /// Capacity of the channel carrying terminal-state reports back to the
  /// driver.
  #[serde(default = "default_report_buffer_size")]
  pub report_buffer_size: usize,

  /// Maximum number of jobs the local dispatcher runs at once.
  #[serde(default = "default_max_concurrent_jobs")]
  pub max_concurrent_jobs: usize,
}

fn default_report_buffer_size() -> usize {
  100
}

fn default_max_concurrent_jobs() -> usize {
  16
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      report_buffer_size: default_report_buffer_size(),
      max_concurrent_jobs: default_max_concurrent_jobs(),
    }
  }
}
