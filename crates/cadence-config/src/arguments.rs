use serde::{Deserialize, Serialize};

use crate::Value;
use crate::options::Options;

/// Positional arguments plus the trailing options map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
  #[serde(default)]
  pub args: Vec<Value>,
  #[serde(default, skip_serializing_if = "Options::is_empty")]
  pub options: Options,
}

impl Arguments {
  pub fn new(args: Vec<Value>, options: Options) -> Self {
    Self { args, options }
  }

  /// Splits a loosely shaped argument list.
  ///
  /// The last element becomes the options map if and only if it is a JSON
  /// object. Everything else stays positional, in order.
  pub fn from_values(mut values: Vec<Value>) -> Self {
    let options = match values.last() {
      Some(Value::Object(_)) => match values.pop() {
        Some(Value::Object(map)) => Options::from(map),
        _ => Options::new(),
      },
      _ => Options::new(),
    };

    Self {
      args: values,
      options,
    }
  }

  /// The flat form: positional arguments followed by the options map when it
  /// is not empty. Inverse of [`Arguments::from_values`].
  pub fn to_values(&self) -> Vec<Value> {
    let mut values = self.args.clone();
    if !self.options.is_empty() {
      values.push(self.options.clone().into_value());
    }
    values
  }

  pub fn is_empty(&self) -> bool {
    self.args.is_empty() && self.options.is_empty()
  }
}

impl From<Vec<Value>> for Arguments {
  fn from(values: Vec<Value>) -> Self {
    Self::from_values(values)
  }
}
