//! Aggregated fork-join output.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::result::PipelineResult;

/// A branch that failed under the best-effort policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchFailure {
  pub node_name: String,
  pub node_type: String,
  pub message: String,
}

/// Named results gathered from upstream nodes or fork-join branches.
///
/// Entries keep insertion order, so fork-join branches appear in enumeration
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinerResult {
  results: IndexMap<String, Arc<PipelineResult>>,
}

impl CombinerResult {
  pub fn new(results: IndexMap<String, Arc<PipelineResult>>) -> Self {
    Self { results }
  }

  pub fn results(&self) -> &IndexMap<String, Arc<PipelineResult>> {
    &self.results
  }

  pub fn get(&self, name: &str) -> Option<&PipelineResult> {
    self.results.get(name).map(|r| r.as_ref())
  }

  pub fn len(&self) -> usize {
    self.results.len()
  }

  pub fn is_empty(&self) -> bool {
    self.results.is_empty()
  }

  /// Entries that are not recorded failures.
  pub fn successes(&self) -> impl Iterator<Item = (&String, &PipelineResult)> {
    self
      .results
      .iter()
      .map(|(k, v)| (k, v.as_ref()))
      .filter(|(_, v)| !v.is_failure())
  }

  pub fn failures(&self) -> impl Iterator<Item = (&String, &BranchFailure)> {
    self
      .results
      .iter()
      .filter_map(|(k, v)| v.as_failure().map(|f| (k, f)))
  }
}
