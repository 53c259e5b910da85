//! Operator error types.

use thiserror::Error;

/// Errors raised by an external collaborator (data cache, event store).
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
  #[error("data source '{data_source}' unavailable: {message}")]
  Unavailable {
    data_source: String,
    message: String,
  },

  #[error("query failed: {message}")]
  Query { message: String },
}

/// Errors an operator reports from `init` or `execute`.
///
/// The engine attaches the node name and type when surfacing these.
#[derive(Debug, Clone, Error)]
pub enum OperatorError {
  /// Missing or malformed parameters.
  #[error("invalid configuration: {message}")]
  Configuration { message: String },

  #[error("missing required input '{key}'")]
  MissingInput { key: String },

  #[error("input '{key}' expected {expected}, got {actual}")]
  InvalidInput {
    key: String,
    expected: &'static str,
    actual: &'static str,
  },

  /// The operator returned without one of its declared outputs.
  #[error("declared output '{key}' was not produced")]
  MissingOutput { key: String },

  #[error("{message}")]
  Execution { message: String },

  #[error(transparent)]
  Collaborator(#[from] CollaboratorError),
}

impl OperatorError {
  pub fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration {
      message: message.into(),
    }
  }

  pub fn execution(message: impl Into<String>) -> Self {
    Self::Execution {
      message: message.into(),
    }
  }
}
