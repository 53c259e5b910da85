use serde::{Deserialize, Serialize};

/// One fan-out item: the properties a fork-join branch substitutes into
/// `${token}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumerationItem {
  pub index: usize,
  pub params: serde_json::Map<String, serde_json::Value>,
}

/// The ordered output of an enumerator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enumeration {
  pub items: Vec<EnumerationItem>,
}

impl Enumeration {
  /// Build from property maps, numbering items in order.
  pub fn from_params(params: Vec<serde_json::Map<String, serde_json::Value>>) -> Self {
    let items = params
      .into_iter()
      .enumerate()
      .map(|(index, params)| EnumerationItem { index, params })
      .collect();
    Self { items }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}
