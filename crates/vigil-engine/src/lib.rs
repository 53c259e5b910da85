//! Vigil Engine
//!
//! Builds detection pipelines from plan node definitions and executes them,
//! expanding fork-joins over enumerations computed at run time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       PlanExecutor                          │
//! │  - run(definitions, window, root) → RunResult               │
//! │  - deadline, cancellation, execution events                 │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PlanNodeFactory                         │
//! │  - resolves types via the OperatorRegistry                  │
//! │  - inits operators, checks references and cycles            │
//! │  - instantiates branch copies of template nodes             │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  execution (per invocation)                 │
//! │  - memoized recursive node execution into a ResultStore     │
//! │  - fork-join: one spawned task per enumeration item         │
//! │  - `${expr}` parameter substitution via minijinja           │
//! │  - bounded worker pool around operator calls                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use vigil_engine::{EngineConfig, PlanExecutor};
//! use vigil_operator::{Collaborators, StaticRegistry};
//!
//! let executor = PlanExecutor::new(
//!   Arc::new(StaticRegistry::with_builtins()),
//!   Collaborators::new(),
//!   EngineConfig::default(),
//! );
//! let result = executor.run(&pipeline.nodes, window, &pipeline.root).await?;
//! ```

mod config;
mod context;
mod error;
mod events;
mod executor;
mod graph;
mod plan;
mod scope;
mod template;

pub use config::EngineConfig;
pub use context::{ContextKey, ResultStore, StoreError};
pub use error::{ErrorKind, PipelineError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::{PlanExecutor, RunResult};
pub use graph::PlanGraph;
pub use plan::{
  FORK_JOIN_TYPE, ForkJoinSpec, NodeKind, PlanNode, PlanNodeFactory, PlanNodeMap, instance_name,
};
pub use template::{has_placeholders, substitute, substitute_params};
