//! The polymorphic node result.

use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyList;
use crate::combiner::{BranchFailure, CombinerResult};
use crate::enumeration::Enumeration;
use crate::table::DataTable;

/// Text produced by an echo operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResult {
  pub text: String,
}

impl EchoResult {
  pub fn new(text: impl Into<String>) -> Self {
    Self { text: text.into() }
  }

  pub fn text(&self) -> &str {
    &self.text
  }
}

/// A value produced by a plan node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineResult {
  Echo(EchoResult),
  Table(DataTable),
  Anomalies(AnomalyList),
  Enumeration(Enumeration),
  Combiner(CombinerResult),
  Failure(BranchFailure),
}

impl PipelineResult {
  pub fn echo(text: impl Into<String>) -> Self {
    Self::Echo(EchoResult::new(text))
  }

  /// Short name of the variant, used in error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Echo(_) => "echo",
      Self::Table(_) => "table",
      Self::Anomalies(_) => "anomalies",
      Self::Enumeration(_) => "enumeration",
      Self::Combiner(_) => "combiner",
      Self::Failure(_) => "failure",
    }
  }

  pub fn as_echo(&self) -> Option<&EchoResult> {
    match self {
      Self::Echo(echo) => Some(echo),
      _ => None,
    }
  }

  pub fn as_table(&self) -> Option<&DataTable> {
    match self {
      Self::Table(table) => Some(table),
      _ => None,
    }
  }

  pub fn as_anomalies(&self) -> Option<&AnomalyList> {
    match self {
      Self::Anomalies(anomalies) => Some(anomalies),
      _ => None,
    }
  }

  pub fn as_enumeration(&self) -> Option<&Enumeration> {
    match self {
      Self::Enumeration(enumeration) => Some(enumeration),
      _ => None,
    }
  }

  pub fn as_combiner(&self) -> Option<&CombinerResult> {
    match self {
      Self::Combiner(combiner) => Some(combiner),
      _ => None,
    }
  }

  pub fn as_failure(&self) -> Option<&BranchFailure> {
    match self {
      Self::Failure(failure) => Some(failure),
      _ => None,
    }
  }

  pub fn is_failure(&self) -> bool {
    matches!(self, Self::Failure(_))
  }
}
