use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detected anomaly interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub metric: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub current: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub baseline: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score: Option<f64>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub dimensions: BTreeMap<String, String>,
}

impl Anomaly {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self {
      start,
      end,
      metric: None,
      current: None,
      baseline: None,
      score: None,
      dimensions: BTreeMap::new(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyList {
  pub anomalies: Vec<Anomaly>,
}

impl AnomalyList {
  pub fn new(anomalies: Vec<Anomaly>) -> Self {
    Self { anomalies }
  }

  pub fn len(&self) -> usize {
    self.anomalies.len()
  }

  pub fn is_empty(&self) -> bool {
    self.anomalies.is_empty()
  }
}
