use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Value;

/// Keyword-style options attached to a builder call, a process or a task.
///
/// Keys are kept sorted so that serialized plans are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, Value>);

impl Options {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(key, value);
    self
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
    self.0.insert(key.into(), value.into())
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  /// Whether `key` is present with a truthy value.
  ///
  /// Only `null` and `false` are falsy; `0`, `""` and empty collections count
  /// as set.
  pub fn is_set(&self, key: &str) -> bool {
    match self.0.get(key) {
      None | Some(Value::Null) | Some(Value::Bool(false)) => false,
      Some(_) => true,
    }
  }

  /// Returns a copy of `self` with every entry of `other` written over it.
  pub fn merged(&self, other: &Options) -> Options {
    let mut merged = self.clone();
    for (key, value) in other.iter() {
      merged.0.insert(key.clone(), value.clone());
    }
    merged
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Converts the options into a JSON object value.
  pub fn into_value(self) -> Value {
    Value::Object(self.0.into_iter().collect())
  }
}

impl From<serde_json::Map<String, Value>> for Options {
  fn from(map: serde_json::Map<String, Value>) -> Self {
    Self(map.into_iter().collect())
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }
}
