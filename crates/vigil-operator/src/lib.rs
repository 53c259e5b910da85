//! Vigil Operator
//!
//! An operator is the executable behavior behind a plan node type. The
//! engine's plan node factory looks a type string up in an
//! [`OperatorRegistry`], creates a fresh [`Operator`] through the returned
//! [`OperatorFactory`], and calls [`Operator::init`] with the node's
//! parameters. At execution time [`Operator::execute`] receives the resolved
//! upstream results keyed by local input key.
//!
//! Operators that read external data declare it by pulling a collaborator
//! (data source cache, event store) out of the [`OperatorContext`] during
//! `init`; the engine only threads [`Collaborators`] through.

mod collaborators;
mod error;
mod operator;
pub mod operators;
pub mod params;
mod registry;

pub use collaborators::{Collaborators, DataRequest, DataSourceCache, EventStore};
pub use error::{CollaboratorError, OperatorError};
pub use operator::{Operator, OperatorContext, OperatorFactory, OperatorInputs, OperatorOutputs};
pub use registry::{OperatorRegistry, StaticRegistry};
