use serde::{Deserialize, Serialize};

use crate::input::InputBinding;

/// Free-form node parameters.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Declarative description of one plan vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNodeDef {
  pub name: String,
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default)]
  pub inputs: Vec<InputBinding>,
  #[serde(default)]
  pub params: Params,
}

impl PlanNodeDef {
  pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      node_type: node_type.into(),
      inputs: Vec::new(),
      params: Params::new(),
    }
  }

  /// Add an input binding.
  pub fn with_input(mut self, binding: InputBinding) -> Self {
    self.inputs.push(binding);
    self
  }

  /// Set a parameter value.
  pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.params.insert(key.into(), value);
    self
  }
}
