use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use vigil_config::{EvaluationWindow, Params};
use vigil_result::PipelineResult;

use crate::collaborators::Collaborators;
use crate::error::OperatorError;

/// Upstream results keyed by the consuming node's local input key, in
/// binding order.
pub type OperatorInputs = IndexMap<String, Arc<PipelineResult>>;

/// Produced results keyed by output slot.
pub type OperatorOutputs = HashMap<String, PipelineResult>;

/// Everything an operator may look at while configuring itself.
pub struct OperatorContext<'a> {
  /// Instance name of the node (synthesized inside fork-join branches).
  pub node_name: &'a str,
  pub node_type: &'a str,
  /// Parameters after placeholder substitution.
  pub params: &'a Params,
  pub window: &'a EvaluationWindow,
  pub collaborators: &'a Collaborators,
}

/// Executable behavior bound to a plan node type.
///
/// One instance is invoked at most once per pipeline execution. Fork-join
/// branches get fresh instances rather than re-entering a shared one.
#[async_trait]
pub trait Operator: Send + Sync {
  /// Configure from the node's parameters. Fails fast on bad configuration.
  fn init(&mut self, ctx: &OperatorContext<'_>) -> Result<(), OperatorError>;

  /// Output slots this operator produces. Must not be empty.
  fn output_keys(&self) -> Vec<String>;

  async fn execute(&self, inputs: OperatorInputs) -> Result<OperatorOutputs, OperatorError>;
}

/// Creates unconfigured operator instances for one node type.
pub trait OperatorFactory: Send + Sync {
  fn create(&self) -> Box<dyn Operator>;
}

impl<F> OperatorFactory for F
where
  F: Fn() -> Box<dyn Operator> + Send + Sync,
{
  fn create(&self) -> Box<dyn Operator> {
    self()
  }
}
