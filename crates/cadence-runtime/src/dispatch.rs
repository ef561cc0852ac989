//! Job dispatch boundary.
//!
//! A job activation is handed to a [`JobDispatcher`] and its terminal state
//! comes back later through a [`ReportSender`]. Nothing here assumes the job
//! runs in the same process as the driver.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_definition::DescriptionRegistry;
use cadence_workflow::JobRef;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::state::{Activation, Outcome};

/// Terminal state of one task, as delivered to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
  pub node_id: String,
  pub outcome: Outcome,
}

/// Handle for delivering terminal reports to a running execution.
#[derive(Debug, Clone)]
pub struct ReportSender {
  sender: mpsc::Sender<Report>,
}

impl ReportSender {
  pub(crate) fn new(sender: mpsc::Sender<Report>) -> Self {
    Self { sender }
  }

  pub async fn send(
    &self,
    node_id: impl Into<String>,
    outcome: Outcome,
  ) -> Result<(), RuntimeError> {
    self
      .sender
      .send(Report {
        node_id: node_id.into(),
        outcome,
      })
      .await
      .map_err(|_| RuntimeError::ChannelClosed)
  }

  pub async fn completed(&self, node_id: impl Into<String>) -> Result<(), RuntimeError> {
    self.send(node_id, Outcome::Completed).await
  }

  pub async fn failed(
    &self,
    node_id: impl Into<String>,
    error: impl Into<String>,
  ) -> Result<(), RuntimeError> {
    self.send(node_id, Outcome::Failed(error.into())).await
  }
}

/// Hands job activations to whatever runs jobs.
///
/// `dispatch` returns once the job is accepted; the job's terminal state is
/// reported through `reporter` whenever it finishes, which may be before
/// `dispatch` itself returns.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
  async fn dispatch(
    &self,
    activation: Activation,
    reporter: ReportSender,
  ) -> Result<(), RuntimeError>;
}

/// Runs jobs on tokio's blocking pool, at most `max_concurrent_jobs` at once.
pub struct LocalJobDispatcher {
  registry: Arc<DescriptionRegistry>,
  permits: Arc<Semaphore>,
}

impl LocalJobDispatcher {
  pub fn new(registry: Arc<DescriptionRegistry>, max_concurrent_jobs: usize) -> Self {
    Self {
      registry,
      permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
    }
  }

  async fn perform(registry: Arc<DescriptionRegistry>, activation: &Activation) -> Outcome {
    let Some(description) = registry.get(&activation.definition) else {
      return Outcome::Failed(format!(
        "no description registered as '{}'",
        activation.definition
      ));
    };
    let Some(job) = description.job(&JobRef::new(activation.target.clone())) else {
      return Outcome::Failed(format!(
        "'{}' is not a job of '{}'",
        activation.target, activation.definition
      ));
    };

    let args = activation.args.clone();
    match tokio::task::spawn_blocking(move || job.perform(&args)).await {
      Ok(Ok(())) => Outcome::Completed,
      Ok(Err(e)) => Outcome::Failed(format!("{:#}", e)),
      Err(e) => Outcome::Failed(format!("job panicked: {}", e)),
    }
  }
}

#[async_trait]
impl JobDispatcher for LocalJobDispatcher {
  async fn dispatch(
    &self,
    activation: Activation,
    reporter: ReportSender,
  ) -> Result<(), RuntimeError> {
    let registry = self.registry.clone();
    let permits = self.permits.clone();

    tokio::spawn(async move {
      // the semaphore is never closed
      let Ok(_permit) = permits.acquire_owned().await else {
        return;
      };
      debug!(
        execution_id = %activation.execution_id,
        node_id = %activation.node_id,
        job = %activation.target,
        "performing job"
      );

      let outcome = Self::perform(registry, &activation).await;
      if reporter.send(activation.node_id.clone(), outcome).await.is_err() {
        warn!(
          execution_id = %activation.execution_id,
          node_id = %activation.node_id,
          "execution gone before job report"
        );
      }
    });

    Ok(())
  }
}

impl std::fmt::Debug for LocalJobDispatcher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LocalJobDispatcher")
      .field("registry", &self.registry)
      .field("available_permits", &self.permits.available_permits())
      .finish()
  }
}
