use serde::{Deserialize, Serialize};

use crate::node::PlanNodeDef;

/// A complete pipeline: the plan plus the node whose output is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDef {
  pub pipeline_id: String,
  pub name: String,
  /// Node whose outputs become the pipeline result.
  pub root: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  pub nodes: Vec<PlanNodeDef>,
}
