//! Engine configuration.

use serde::{Deserialize, Serialize};
use vigil_config::FailurePolicy;

/// Tunables shared by every pipeline the engine runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Maximum number of operators executing at once.
  pub worker_pool_size: usize,
  /// Deadline for a whole pipeline run. `None` disables it.
  pub timeout_ms: Option<u64>,
  /// Policy for fork-joins that do not set their own.
  pub failure_policy: FailurePolicy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      worker_pool_size: 8,
      timeout_ms: Some(300_000),
      failure_policy: FailurePolicy::FailFast,
    }
  }
}
