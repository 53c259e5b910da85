//! External collaborators injected into operators.
//!
//! The engine never calls these itself; it hands a [`Collaborators`] bundle
//! to every operator's `init` so operators that need external data can keep
//! a handle.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use vigil_config::EvaluationWindow;
use vigil_result::DataTable;

use crate::error::CollaboratorError;

/// A time-series query against a named data source.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
  pub data_source: String,
  pub query: String,
  pub window: EvaluationWindow,
}

/// Serves time-series tables to leaf operators.
#[async_trait]
pub trait DataSourceCache: Send + Sync {
  async fn fetch(&self, request: &DataRequest) -> Result<DataTable, CollaboratorError>;
}

/// Serves external events (holidays, deployments, ...) overlapping a window.
#[async_trait]
pub trait EventStore: Send + Sync {
  async fn fetch_events(
    &self,
    window: &EvaluationWindow,
    types: &[String],
  ) -> Result<DataTable, CollaboratorError>;
}

/// Shared collaborators available to operators of one pipeline invocation.
#[derive(Clone, Default)]
pub struct Collaborators {
  data_source_cache: Option<Arc<dyn DataSourceCache>>,
  event_store: Option<Arc<dyn EventStore>>,
}

impl Collaborators {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_data_source_cache(mut self, cache: Arc<dyn DataSourceCache>) -> Self {
    self.data_source_cache = Some(cache);
    self
  }

  pub fn with_event_store(mut self, store: Arc<dyn EventStore>) -> Self {
    self.event_store = Some(store);
    self
  }

  pub fn data_source_cache(&self) -> Option<&Arc<dyn DataSourceCache>> {
    self.data_source_cache.as_ref()
  }

  pub fn event_store(&self) -> Option<&Arc<dyn EventStore>> {
    self.event_store.as_ref()
  }
}

impl fmt::Debug for Collaborators {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Collaborators")
      .field("data_source_cache", &self.data_source_cache.is_some())
      .field("event_store", &self.event_store.is_some())
      .finish()
  }
}
