use std::collections::HashMap;

use async_trait::async_trait;
use vigil_result::{CombinerResult, PipelineResult};

use crate::error::OperatorError;
use crate::operator::{Operator, OperatorContext, OperatorInputs, OperatorOutputs};

/// Gathers every input into a single [`CombinerResult`] keyed by input key.
///
/// A fork-join feeds it one input per branch, keyed by the branch root's
/// instance name.
#[derive(Debug, Default)]
pub struct CombinerOperator;

impl CombinerOperator {
  pub const TYPE: &'static str = "Combiner";
  pub const OUTPUT: &'static str = "combiner";
}

#[async_trait]
impl Operator for CombinerOperator {
  fn init(&mut self, _ctx: &OperatorContext<'_>) -> Result<(), OperatorError> {
    Ok(())
  }

  fn output_keys(&self) -> Vec<String> {
    vec![Self::OUTPUT.to_string()]
  }

  async fn execute(&self, inputs: OperatorInputs) -> Result<OperatorOutputs, OperatorError> {
    let combined = CombinerResult::new(inputs);
    Ok(HashMap::from([(
      Self::OUTPUT.to_string(),
      PipelineResult::Combiner(combined),
    )]))
  }
}
