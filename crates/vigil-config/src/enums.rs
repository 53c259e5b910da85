use serde::{Deserialize, Serialize};

/// How a fork-join reacts to a failing branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
  /// Abort the whole fork-join on the first branch failure.
  #[default]
  FailFast,
  /// Keep going and record failures next to successes in the combiner map.
  BestEffort,
}

impl FailurePolicy {
  /// Parse the snake_case form used in node parameters.
  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "fail_fast" => Some(Self::FailFast),
      "best_effort" => Some(Self::BestEffort),
      _ => None,
    }
  }
}
