//! Name resolution scopes for fork-join branches.
//!
//! The root scope holds the built plan. Each branch gets a scope holding only
//! the node instances re-created for it, chained to the scope of the
//! enclosing fork-join. Lookups walk outward, so nodes that do not depend on
//! the branch item resolve to a single shared instance.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vigil_config::Params;

use crate::plan::PlanNode;

pub(crate) struct Scope {
  nodes: HashMap<String, Arc<PlanNode>>,
  parent: Option<Arc<Scope>>,
  /// Enumeration item properties, merged with those of enclosing branches.
  properties: Params,
  cancel: CancellationToken,
}

impl Scope {
  pub fn root(nodes: HashMap<String, Arc<PlanNode>>, cancel: CancellationToken) -> Arc<Self> {
    Arc::new(Self {
      nodes,
      parent: None,
      properties: Params::new(),
      cancel,
    })
  }

  /// A branch scope. `properties` must already include the parent's, see
  /// [`merge_properties`].
  pub fn branch(
    parent: &Arc<Scope>,
    nodes: HashMap<String, Arc<PlanNode>>,
    properties: Params,
    cancel: CancellationToken,
  ) -> Arc<Self> {
    Arc::new(Self {
      nodes,
      parent: Some(parent.clone()),
      properties,
      cancel,
    })
  }

  /// Find a node by definition name, returning it with the scope that owns it.
  pub fn resolve(self: &Arc<Self>, name: &str) -> Option<(Arc<PlanNode>, Arc<Scope>)> {
    let mut scope = self;
    loop {
      if let Some(node) = scope.nodes.get(name) {
        return Some((node.clone(), scope.clone()));
      }
      scope = scope.parent.as_ref()?;
    }
  }

  pub fn properties(&self) -> &Params {
    &self.properties
  }

  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }
}

/// Merge item properties over inherited ones.
pub(crate) fn merge_properties(outer: &Params, inner: &Params) -> Params {
  let mut merged = outer.clone();
  for (key, value) in inner {
    merged.insert(key.clone(), value.clone());
  }
  merged
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn props(value: serde_json::Value) -> Params {
    value.as_object().cloned().unwrap()
  }

  #[test]
  fn test_inner_properties_shadow_outer() {
    let merged = merge_properties(
      &props(json!({ "metric": "clicks", "region": "us" })),
      &props(json!({ "metric": "views" })),
    );
    assert_eq!(merged["metric"], json!("views"));
    assert_eq!(merged["region"], json!("us"));
  }

  #[test]
  fn test_branch_inherits_and_resolves_outward() {
    let root = Scope::root(HashMap::new(), CancellationToken::new());
    let outer = Scope::branch(
      &root,
      HashMap::new(),
      merge_properties(root.properties(), &props(json!({ "a": 1 }))),
      root.cancel_token().child_token(),
    );
    let inner = Scope::branch(
      &outer,
      HashMap::new(),
      merge_properties(outer.properties(), &props(json!({ "b": 2 }))),
      outer.cancel_token().child_token(),
    );
    assert_eq!(inner.properties(), &props(json!({ "a": 1, "b": 2 })));
    assert!(inner.resolve("missing").is_none());

    root.cancel_token().cancel();
    assert!(inner.cancel_token().is_cancelled());
  }
}
