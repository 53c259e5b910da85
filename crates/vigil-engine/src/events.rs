//! Execution events and notifiers.
//!
//! Events are emitted while a pipeline runs so consumers can observe
//! progress, record per-node timings, stream to a UI, etc.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  PipelineStarted {
    execution_id: String,
    root: String,
  },

  /// An operator node instance started executing.
  NodeStarted {
    execution_id: String,
    node_name: String,
    node_type: String,
  },

  NodeCompleted {
    execution_id: String,
    node_name: String,
    outputs: Vec<String>,
  },

  NodeFailed {
    execution_id: String,
    node_name: String,
    error: String,
  },

  /// A fork-join expanded into `branches` branches.
  ForkStarted {
    execution_id: String,
    node_name: String,
    branches: usize,
  },

  BranchCompleted {
    execution_id: String,
    node_name: String,
    branch: String,
  },

  BranchFailed {
    execution_id: String,
    node_name: String,
    branch: String,
    error: String,
  },

  PipelineCompleted { execution_id: String },

  PipelineFailed { execution_id: String, error: String },
}

/// Receives execution events.
///
/// Called inline from the engine, so implementations should not block.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls execution; volume is a few
  // events per node.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
