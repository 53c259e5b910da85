//! Vigil Result
//!
//! Every plan node produces one or more [`PipelineResult`] values, addressed
//! by `(node, output key)` in the engine's result store. The type is a closed
//! sum so consumers match on it exhaustively instead of downcasting.

mod anomaly;
mod combiner;
mod enumeration;
mod result;
mod table;

pub use anomaly::{Anomaly, AnomalyList};
pub use combiner::{BranchFailure, CombinerResult};
pub use enumeration::{Enumeration, EnumerationItem};
pub use result::{EchoResult, PipelineResult};
pub use table::{Column, ColumnType, DataTable, TableError};
