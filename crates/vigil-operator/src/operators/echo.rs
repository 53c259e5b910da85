use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use vigil_result::PipelineResult;

use crate::error::OperatorError;
use crate::operator::{Operator, OperatorContext, OperatorInputs, OperatorOutputs};

/// Returns its `echo` parameter as text. Mostly useful for wiring tests.
#[derive(Debug, Default)]
pub struct EchoOperator {
  text: String,
}

impl EchoOperator {
  pub const TYPE: &'static str = "Echo";
  pub const PARAM: &'static str = "echo";
  pub const OUTPUT: &'static str = "result";
}

#[async_trait]
impl Operator for EchoOperator {
  fn init(&mut self, ctx: &OperatorContext<'_>) -> Result<(), OperatorError> {
    let value = ctx.params.get(Self::PARAM).ok_or_else(|| {
      OperatorError::configuration(format!("missing required parameter '{}'", Self::PARAM))
    })?;
    self.text = match value {
      Value::String(s) => s.clone(),
      Value::Number(n) => n.to_string(),
      Value::Bool(b) => b.to_string(),
      other => {
        return Err(OperatorError::configuration(format!(
          "parameter '{}' must be a scalar, got {}",
          Self::PARAM,
          other
        )));
      }
    };
    Ok(())
  }

  fn output_keys(&self) -> Vec<String> {
    vec![Self::OUTPUT.to_string()]
  }

  async fn execute(&self, _inputs: OperatorInputs) -> Result<OperatorOutputs, OperatorError> {
    Ok(HashMap::from([(
      Self::OUTPUT.to_string(),
      PipelineResult::echo(self.text.clone()),
    )]))
  }
}
