//! Error types for plan building and execution.

use thiserror::Error;
use vigil_operator::OperatorError;

/// Broad classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The plan is invalid. Nothing was executed.
  Configuration,
  /// An operator or branch failed at run time.
  Execution,
  Timeout,
  Cancelled,
  /// An engine invariant was violated.
  Internal,
}

/// Errors that can occur while building or executing a plan.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
  #[error("invalid node name '{node_name}': {reason}")]
  InvalidNodeName { node_name: String, reason: String },

  #[error("duplicate node name '{node_name}'")]
  DuplicateNode { node_name: String },

  #[error("node '{node_name}' has unknown type '{node_type}'")]
  UnknownOperatorType {
    node_name: String,
    node_type: String,
  },

  /// A reference to a node that does not exist, or to an output the
  /// referenced node does not declare.
  #[error("node '{node_name}' has a dangling reference: {message}")]
  DanglingReference {
    node_name: String,
    node_type: String,
    message: String,
  },

  #[error("invalid parameters for node '{node_name}' ({node_type}): {message}")]
  InvalidParams {
    node_name: String,
    node_type: String,
    message: String,
  },

  #[error("dependency cycle: {}", path.join(" -> "))]
  Cycle { path: Vec<String> },

  #[error("unknown node '{node_name}'")]
  UnknownNode { node_name: String },

  #[error("node '{node_name}' ({node_type}) failed: {source}")]
  Execution {
    node_name: String,
    node_type: String,
    #[source]
    source: OperatorError,
  },

  /// A fork-join branch failed under the fail-fast policy.
  #[error("fork-join '{node_name}' branch '{branch}' failed: {source}")]
  BranchFailed {
    node_name: String,
    node_type: String,
    branch: String,
    #[source]
    source: Box<PipelineError>,
  },

  #[error(
    "fork-join '{node_name}' had {succeeded} successful branches, {required} required"
  )]
  InsufficientBranches {
    node_name: String,
    succeeded: usize,
    required: usize,
  },

  #[error("node '{node_name}' ({node_type}) timed out after {timeout_ms}ms")]
  Timeout {
    node_name: String,
    node_type: String,
    timeout_ms: u64,
  },

  #[error("pipeline execution cancelled")]
  Cancelled,

  #[error("internal engine error: {message}")]
  Internal { message: String },
}

impl PipelineError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidNodeName { .. }
      | Self::DuplicateNode { .. }
      | Self::UnknownOperatorType { .. }
      | Self::DanglingReference { .. }
      | Self::InvalidParams { .. }
      | Self::Cycle { .. }
      | Self::UnknownNode { .. } => ErrorKind::Configuration,
      Self::Execution { .. } | Self::BranchFailed { .. } | Self::InsufficientBranches { .. } => {
        ErrorKind::Execution
      }
      Self::Timeout { .. } => ErrorKind::Timeout,
      Self::Cancelled => ErrorKind::Cancelled,
      Self::Internal { .. } => ErrorKind::Internal,
    }
  }

  /// The node the error is attributed to, if any.
  ///
  /// For a cycle this is the first node on the cycle path.
  pub fn node_name(&self) -> Option<&str> {
    match self {
      Self::InvalidNodeName { node_name, .. }
      | Self::DuplicateNode { node_name }
      | Self::UnknownOperatorType { node_name, .. }
      | Self::DanglingReference { node_name, .. }
      | Self::InvalidParams { node_name, .. }
      | Self::UnknownNode { node_name }
      | Self::Execution { node_name, .. }
      | Self::BranchFailed { node_name, .. }
      | Self::InsufficientBranches { node_name, .. }
      | Self::Timeout { node_name, .. } => Some(node_name),
      Self::Cycle { path } => path.first().map(String::as_str),
      Self::Cancelled | Self::Internal { .. } => None,
    }
  }

  pub fn node_type(&self) -> Option<&str> {
    match self {
      Self::UnknownOperatorType { node_type, .. }
      | Self::DanglingReference { node_type, .. }
      | Self::InvalidParams { node_type, .. }
      | Self::Execution { node_type, .. }
      | Self::BranchFailed { node_type, .. }
      | Self::Timeout { node_type, .. } => Some(node_type),
      _ => None,
    }
  }
}
