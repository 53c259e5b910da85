//! Vigil Config
//!
//! This crate contains the serializable pipeline configuration types for Vigil.
//! These types represent plan node definitions before they are turned into
//! runnable nodes by the engine's plan node factory.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `vigil run pipeline.json`)
//! - Persisted configuration entities (as JSON blobs)
//!
//! Parameter values are free-form JSON and may contain `${token}` placeholders
//! that are resolved per enumeration item when a node runs inside a fork-join
//! branch.

mod enums;
mod input;
mod node;
mod pipeline;
mod window;

pub use enums::FailurePolicy;
pub use input::InputBinding;
pub use node::{Params, PlanNodeDef};
pub use pipeline::PipelineDef;
pub use window::{EvaluationWindow, WindowError};
