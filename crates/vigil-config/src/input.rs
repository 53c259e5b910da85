//! Input bindings between plan nodes.
//!
//! A binding wires one named output of a sibling node into a local input slot
//! of the consuming node:
//!
//! ```json
//! { "source_node": "fetch", "source_output": "table", "local_key": "current" }
//! ```

use serde::{Deserialize, Serialize};

/// Reference from a node's local input key to another node's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBinding {
  /// Name of the upstream node.
  pub source_node: String,
  /// Output slot of the upstream node.
  pub source_output: String,
  /// Key under which the consuming operator sees the result.
  pub local_key: String,
}

impl InputBinding {
  pub fn new(
    source_node: impl Into<String>,
    source_output: impl Into<String>,
    local_key: impl Into<String>,
  ) -> Self {
    Self {
      source_node: source_node.into(),
      source_output: source_output.into(),
      local_key: local_key.into(),
    }
  }
}
