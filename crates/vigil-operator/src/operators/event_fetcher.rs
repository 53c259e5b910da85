use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use vigil_config::EvaluationWindow;
use vigil_result::PipelineResult;

use crate::collaborators::EventStore;
use crate::error::OperatorError;
use crate::operator::{Operator, OperatorContext, OperatorInputs, OperatorOutputs};
use crate::params;

/// Fetches external events overlapping the evaluation window.
///
/// An absent `types` parameter fetches every event type.
#[derive(Default)]
pub struct EventFetcherOperator {
  types: Vec<String>,
  window: Option<EvaluationWindow>,
  store: Option<Arc<dyn EventStore>>,
}

impl EventFetcherOperator {
  pub const TYPE: &'static str = "EventFetcher";
  pub const TYPES: &'static str = "types";
  pub const OUTPUT: &'static str = "events";
}

#[async_trait]
impl Operator for EventFetcherOperator {
  fn init(&mut self, ctx: &OperatorContext<'_>) -> Result<(), OperatorError> {
    self.types = params::optional_str_list(ctx.params, Self::TYPES)?.unwrap_or_default();
    self.store = Some(
      ctx
        .collaborators
        .event_store()
        .cloned()
        .ok_or_else(|| OperatorError::configuration("no event store configured"))?,
    );
    self.window = Some(*ctx.window);
    Ok(())
  }

  fn output_keys(&self) -> Vec<String> {
    vec![Self::OUTPUT.to_string()]
  }

  async fn execute(&self, _inputs: OperatorInputs) -> Result<OperatorOutputs, OperatorError> {
    let (Some(window), Some(store)) = (&self.window, &self.store) else {
      return Err(OperatorError::execution("operator used before init"));
    };

    let events = store.fetch_events(window, &self.types).await?;
    Ok(HashMap::from([(
      Self::OUTPUT.to_string(),
      PipelineResult::Table(events),
    )]))
  }
}
