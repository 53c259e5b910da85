//! Node type → operator factory lookup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::operator::{Operator, OperatorFactory};
use crate::operators::{
  CombinerOperator, DataFetcherOperator, EchoOperator, EnumeratorOperator, EventFetcherOperator,
};

/// Resolves a node type string to the factory for its operator.
///
/// Queried once per distinct type while a plan is built; unknown types are
/// rejected there, never at execution time.
pub trait OperatorRegistry: Send + Sync {
  fn resolve(&self, node_type: &str) -> Option<Arc<dyn OperatorFactory>>;
}

/// A registration table filled at startup.
#[derive(Clone, Default)]
pub struct StaticRegistry {
  factories: HashMap<String, Arc<dyn OperatorFactory>>,
}

impl StaticRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the built-in operators registered.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry
      .register(EchoOperator::TYPE, || {
        Box::new(EchoOperator::default()) as Box<dyn Operator>
      })
      .register(EnumeratorOperator::TYPE, || {
        Box::new(EnumeratorOperator::default()) as Box<dyn Operator>
      })
      .register(CombinerOperator::TYPE, || {
        Box::new(CombinerOperator) as Box<dyn Operator>
      })
      .register(DataFetcherOperator::TYPE, || {
        Box::new(DataFetcherOperator::default()) as Box<dyn Operator>
      })
      .register(EventFetcherOperator::TYPE, || {
        Box::new(EventFetcherOperator::default()) as Box<dyn Operator>
      });
    registry
  }

  /// Register (or replace) the factory for a node type.
  pub fn register<F>(&mut self, node_type: impl Into<String>, factory: F) -> &mut Self
  where
    F: OperatorFactory + 'static,
  {
    self.factories.insert(node_type.into(), Arc::new(factory));
    self
  }

  /// Registered type names, sorted.
  pub fn types(&self) -> Vec<&str> {
    let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
    types.sort_unstable();
    types
  }
}

impl OperatorRegistry for StaticRegistry {
  fn resolve(&self, node_type: &str) -> Option<Arc<dyn OperatorFactory>> {
    self.factories.get(node_type).cloned()
  }
}
