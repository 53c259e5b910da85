use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use vigil_result::PipelineResult;

use crate::collaborators::{DataRequest, DataSourceCache};
use crate::error::OperatorError;
use crate::operator::{Operator, OperatorContext, OperatorInputs, OperatorOutputs};
use crate::params;

/// Fetches a time-series table for the evaluation window from the data
/// source cache.
#[derive(Default)]
pub struct DataFetcherOperator {
  request: Option<DataRequest>,
  cache: Option<Arc<dyn DataSourceCache>>,
}

impl DataFetcherOperator {
  pub const TYPE: &'static str = "DataFetcher";
  pub const DATA_SOURCE: &'static str = "data_source";
  pub const QUERY: &'static str = "query";
  pub const OUTPUT: &'static str = "table";
}

#[async_trait]
impl Operator for DataFetcherOperator {
  fn init(&mut self, ctx: &OperatorContext<'_>) -> Result<(), OperatorError> {
    let data_source = params::required_str(ctx.params, Self::DATA_SOURCE)?;
    let query = params::required_str(ctx.params, Self::QUERY)?;
    let cache = ctx
      .collaborators
      .data_source_cache()
      .cloned()
      .ok_or_else(|| OperatorError::configuration("no data source cache configured"))?;

    self.request = Some(DataRequest {
      data_source: data_source.to_string(),
      query: query.to_string(),
      window: *ctx.window,
    });
    self.cache = Some(cache);
    Ok(())
  }

  fn output_keys(&self) -> Vec<String> {
    vec![Self::OUTPUT.to_string()]
  }

  async fn execute(&self, _inputs: OperatorInputs) -> Result<OperatorOutputs, OperatorError> {
    let (Some(request), Some(cache)) = (&self.request, &self.cache) else {
      return Err(OperatorError::execution("operator used before init"));
    };

    let table = cache.fetch(request).await?;
    tracing::debug!(
      data_source = %request.data_source,
      rows = table.row_count(),
      "data_fetched"
    );
    Ok(HashMap::from([(
      Self::OUTPUT.to_string(),
      PipelineResult::Table(table),
    )]))
  }
}
