use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::description::WorkflowDescription;

/// Descriptions by name.
///
/// Every built process records the name of the description it was built
/// against; the runtime resolves steps and jobs through this registry.
#[derive(Clone, Default)]
pub struct DescriptionRegistry {
  descriptions: HashMap<String, Arc<dyn WorkflowDescription>>,
}

impl DescriptionRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a description under its own name, replacing any previous one.
  pub fn register(
    &mut self,
    description: Arc<dyn WorkflowDescription>,
  ) -> Option<Arc<dyn WorkflowDescription>> {
    let name = description.name().to_string();
    let previous = self.descriptions.insert(name.clone(), description);
    if previous.is_some() {
      warn!(definition = %name, "replacing registered description");
    }
    previous
  }

  /// Builder-style [`DescriptionRegistry::register`].
  pub fn with(mut self, description: impl WorkflowDescription + 'static) -> Self {
    self.register(Arc::new(description));
    self
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn WorkflowDescription>> {
    self.descriptions.get(name).cloned()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.descriptions.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.descriptions.keys().map(String::as_str)
  }
}

impl std::fmt::Debug for DescriptionRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DescriptionRegistry")
      .field("descriptions", &self.descriptions.keys().collect::<Vec<_>>())
      .finish()
  }
}
