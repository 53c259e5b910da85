//! The per-execution result store.
//!
//! Results are addressed by `(node instance name, output key)`. The store is
//! write-once per key and append-only; it is the only channel through which
//! nodes observe each other's outputs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use vigil_result::PipelineResult;

/// Address of one produced result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey {
  node: String,
  output: String,
}

impl ContextKey {
  pub fn new(node: impl Into<String>, output: impl Into<String>) -> Self {
    Self {
      node: node.into(),
      output: output.into(),
    }
  }

  pub fn node(&self) -> &str {
    &self.node
  }

  pub fn output(&self) -> &str {
    &self.output
  }
}

impl fmt::Display for ContextKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.node, self.output)
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("result already stored for {0}")]
  DuplicateKey(ContextKey),
}

/// Shared store of every result produced during one execution.
#[derive(Debug, Default)]
pub struct ResultStore {
  results: RwLock<HashMap<ContextKey, Arc<PipelineResult>>>,
}

impl ResultStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &ContextKey) -> Option<Arc<PipelineResult>> {
    self.read().get(key).cloned()
  }

  /// Store a single result. Fails if the key was already written.
  pub fn put(&self, key: ContextKey, result: PipelineResult) -> Result<(), StoreError> {
    let mut results = self.write();
    if results.contains_key(&key) {
      return Err(StoreError::DuplicateKey(key));
    }
    results.insert(key, Arc::new(result));
    Ok(())
  }

  /// Store every output of one node under a single write lock.
  ///
  /// Either all outputs are written or, on a duplicate, none are.
  pub fn put_outputs(
    &self,
    node: &str,
    outputs: HashMap<String, PipelineResult>,
  ) -> Result<(), StoreError> {
    let mut results = self.write();
    if let Some(output) = outputs
      .keys()
      .find(|output| results.contains_key(&ContextKey::new(node, output.as_str())))
    {
      return Err(StoreError::DuplicateKey(ContextKey::new(node, output.as_str())));
    }
    for (output, result) in outputs {
      results.insert(ContextKey::new(node, output), Arc::new(result));
    }
    Ok(())
  }

  pub fn contains(&self, key: &ContextKey) -> bool {
    self.read().contains_key(key)
  }

  /// Whether every listed output of `node` has been stored.
  pub fn contains_all(&self, node: &str, outputs: &[String]) -> bool {
    let results = self.read();
    outputs
      .iter()
      .all(|output| results.contains_key(&ContextKey::new(node, output.as_str())))
  }

  pub fn len(&self) -> usize {
    self.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.read().is_empty()
  }

  /// All stored keys, sorted.
  pub fn keys(&self) -> Vec<ContextKey> {
    let mut keys: Vec<ContextKey> = self.read().keys().cloned().collect();
    keys.sort();
    keys
  }

  /// Every stored output of one node instance, keyed by output key.
  pub fn outputs_of(&self, node: &str) -> BTreeMap<String, Arc<PipelineResult>> {
    self
      .read()
      .iter()
      .filter(|(key, _)| key.node == node)
      .map(|(key, result)| (key.output.clone(), result.clone()))
      .collect()
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ContextKey, Arc<PipelineResult>>> {
    self.results.read().unwrap_or_else(|e| e.into_inner())
  }

  fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ContextKey, Arc<PipelineResult>>> {
    self.results.write().unwrap_or_else(|e| e.into_inner())
  }
}
