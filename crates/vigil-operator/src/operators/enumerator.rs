use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use vigil_config::Params;
use vigil_result::{Enumeration, PipelineResult};

use crate::error::OperatorError;
use crate::operator::{Operator, OperatorContext, OperatorInputs, OperatorOutputs};

/// Produces the items a fork-join fans out over.
///
/// Items come from the `items` parameter (a list of objects), from the rows
/// of a table bound to the `items` input, or both; parameter items come
/// first. Each item's properties are what `${token}` placeholders in the
/// branch substitute against.
#[derive(Debug, Default)]
pub struct EnumeratorOperator {
  items: Option<Vec<Params>>,
}

impl EnumeratorOperator {
  pub const TYPE: &'static str = "Enumerator";
  pub const ITEMS: &'static str = "items";
  pub const OUTPUT: &'static str = "enumeration";
}

#[async_trait]
impl Operator for EnumeratorOperator {
  fn init(&mut self, ctx: &OperatorContext<'_>) -> Result<(), OperatorError> {
    self.items = match ctx.params.get(Self::ITEMS) {
      None | Some(Value::Null) => None,
      Some(Value::Array(list)) => Some(
        list
          .iter()
          .map(|item| {
            item.as_object().cloned().ok_or_else(|| {
              OperatorError::configuration(format!(
                "enumeration items must be objects, got {}",
                item
              ))
            })
          })
          .collect::<Result<Vec<_>, _>>()?,
      ),
      Some(other) => {
        return Err(OperatorError::configuration(format!(
          "parameter '{}' must be a list, got {}",
          Self::ITEMS,
          other
        )));
      }
    };
    Ok(())
  }

  fn output_keys(&self) -> Vec<String> {
    vec![Self::OUTPUT.to_string()]
  }

  async fn execute(&self, inputs: OperatorInputs) -> Result<OperatorOutputs, OperatorError> {
    let from_input = match inputs.get(Self::ITEMS) {
      Some(input) => {
        let table = input.as_table().ok_or_else(|| OperatorError::InvalidInput {
          key: Self::ITEMS.to_string(),
          expected: "table",
          actual: input.kind(),
        })?;
        Some(table.records())
      }
      None => None,
    };

    let items = match (&self.items, from_input) {
      (None, None) => {
        return Err(OperatorError::MissingInput {
          key: Self::ITEMS.to_string(),
        });
      }
      (Some(params), None) => params.clone(),
      (None, Some(rows)) => rows,
      (Some(params), Some(rows)) => params.iter().cloned().chain(rows).collect(),
    };

    tracing::debug!(count = items.len(), "enumeration_produced");
    Ok(HashMap::from([(
      Self::OUTPUT.to_string(),
      PipelineResult::Enumeration(Enumeration::from_params(items)),
    )]))
  }
}
