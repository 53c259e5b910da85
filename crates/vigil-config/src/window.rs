use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WindowError {
  #[error("evaluation window start {start} is after end {end}")]
  StartAfterEnd {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  },

  #[error("timestamp {millis}ms is out of range")]
  OutOfRange { millis: i64 },
}

/// The `[start, end]` interval a pipeline run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationWindow {
  start: DateTime<Utc>,
  end: DateTime<Utc>,
}

impl EvaluationWindow {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
    if start > end {
      return Err(WindowError::StartAfterEnd { start, end });
    }
    Ok(Self { start, end })
  }

  /// Build a window from epoch milliseconds.
  pub fn from_millis(start_ms: i64, end_ms: i64) -> Result<Self, WindowError> {
    let timestamp = |millis: i64| {
      DateTime::from_timestamp_millis(millis).ok_or(WindowError::OutOfRange { millis })
    };
    Self::new(timestamp(start_ms)?, timestamp(end_ms)?)
  }

  pub fn start(&self) -> DateTime<Utc> {
    self.start
  }

  pub fn end(&self) -> DateTime<Utc> {
    self.end
  }

  pub fn duration(&self) -> chrono::Duration {
    self.end - self.start
  }
}
