//! Plan execution with memoization and dynamic fork-join expansion.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::{OnceCell, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use vigil_config::{EvaluationWindow, FailurePolicy, Params, PipelineDef, PlanNodeDef};
use vigil_operator::{
  Collaborators, OperatorError, OperatorInputs, OperatorOutputs, OperatorRegistry,
};
use vigil_result::{BranchFailure, PipelineResult};

use crate::config::EngineConfig;
use crate::context::{ContextKey, ResultStore};
use crate::error::PipelineError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::plan::{
  FORK_JOIN_TYPE, ForkJoinSpec, NodeKind, PlanNode, PlanNodeFactory, PlanNodeMap, instance_name,
};
use crate::scope::{Scope, merge_properties};
use crate::template::{has_placeholders, substitute_params};

type NodeFuture = Pin<Box<dyn Future<Output = Result<Arc<PlanNode>, PipelineError>> + Send>>;
type UnitFuture = Pin<Box<dyn Future<Output = Result<(), PipelineError>> + Send>>;
type BranchFuture =
  Pin<Box<dyn Future<Output = Result<Arc<PipelineResult>, PipelineError>> + Send>>;

/// Outputs of the requested root node after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
  pub execution_id: String,
  pub node_name: String,
  pub outputs: BTreeMap<String, Arc<PipelineResult>>,
}

impl RunResult {
  pub fn output(&self, key: &str) -> Option<&PipelineResult> {
    self.outputs.get(key).map(Arc::as_ref)
  }
}

/// Builds plans and executes them.
///
/// Each call to [`run`](Self::run) builds a fresh plan and result store,
/// so nothing is shared between invocations.
pub struct PlanExecutor<N: ExecutionNotifier = NoopNotifier> {
  factory: PlanNodeFactory,
  config: EngineConfig,
  notifier: Arc<N>,
}

impl PlanExecutor<NoopNotifier> {
  pub fn new(
    registry: Arc<dyn OperatorRegistry>,
    collaborators: Collaborators,
    config: EngineConfig,
  ) -> Self {
    Self {
      factory: PlanNodeFactory::new(registry, collaborators),
      config,
      notifier: Arc::new(NoopNotifier),
    }
  }
}

impl<N: ExecutionNotifier + 'static> PlanExecutor<N> {
  /// Replace the notifier that receives execution events.
  pub fn with_notifier<M: ExecutionNotifier + 'static>(self, notifier: M) -> PlanExecutor<M> {
    PlanExecutor {
      factory: self.factory,
      config: self.config,
      notifier: Arc::new(notifier),
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Validate definitions and build a plan without executing anything.
  pub fn build_plan(
    &self,
    definitions: &[PlanNodeDef],
    window: &EvaluationWindow,
  ) -> Result<PlanNodeMap, PipelineError> {
    self.factory.build(definitions, window)
  }

  /// Build a plan and produce the outputs of `root`.
  pub async fn run(
    &self,
    definitions: &[PlanNodeDef],
    window: EvaluationWindow,
    root: &str,
  ) -> Result<RunResult, PipelineError> {
    self
      .run_with_cancel(definitions, window, root, CancellationToken::new())
      .await
  }

  /// Like [`run`](Self::run), stopping early when `cancel` fires.
  pub async fn run_with_cancel(
    &self,
    definitions: &[PlanNodeDef],
    window: EvaluationWindow,
    root: &str,
    cancel: CancellationToken,
  ) -> Result<RunResult, PipelineError> {
    self
      .run_inner(definitions, window, root, self.config.timeout_ms, cancel)
      .await
  }

  /// Run a pipeline definition. Its own timeout overrides the engine's.
  pub async fn run_pipeline(
    &self,
    pipeline: &PipelineDef,
    window: EvaluationWindow,
    cancel: CancellationToken,
  ) -> Result<RunResult, PipelineError> {
    let timeout_ms = pipeline.timeout_ms.or(self.config.timeout_ms);
    self
      .run_inner(&pipeline.nodes, window, &pipeline.root, timeout_ms, cancel)
      .await
  }

  /// Ensure `node_name` has run against `store`, running its dependencies
  /// first. A node whose outputs are already stored is not run again.
  #[instrument(name = "plan_execute_node", skip_all, fields(node = %node_name))]
  pub async fn execute_plan_node(
    &self,
    plan: &PlanNodeMap,
    store: Arc<ResultStore>,
    node_name: &str,
  ) -> Result<(), PipelineError> {
    let execution = self.execution(uuid::Uuid::new_v4().to_string(), *plan.window(), store);
    let scope = Scope::root(plan.nodes().clone(), CancellationToken::new());
    execution
      .execute_node(scope, node_name.to_string(), Vec::new())
      .await
      .map(|_| ())
  }

  #[instrument(name = "pipeline_run", skip_all, fields(root = %root))]
  async fn run_inner(
    &self,
    definitions: &[PlanNodeDef],
    window: EvaluationWindow,
    root: &str,
    timeout_ms: Option<u64>,
    cancel: CancellationToken,
  ) -> Result<RunResult, PipelineError> {
    let execution_id = uuid::Uuid::new_v4().to_string();

    info!(
      execution_id = %execution_id,
      root = %root,
      nodes = definitions.len(),
      "pipeline_started"
    );
    self.notifier.notify(ExecutionEvent::PipelineStarted {
      execution_id: execution_id.clone(),
      root: root.to_string(),
    });

    let result = self
      .execute_root(&execution_id, definitions, window, root, timeout_ms, cancel)
      .await;

    match &result {
      Ok(_) => {
        info!(execution_id = %execution_id, "pipeline_completed");
        self.notifier.notify(ExecutionEvent::PipelineCompleted {
          execution_id: execution_id.clone(),
        });
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "pipeline_failed");
        self.notifier.notify(ExecutionEvent::PipelineFailed {
          execution_id: execution_id.clone(),
          error: e.to_string(),
        });
      }
    }

    result
  }

  async fn execute_root(
    &self,
    execution_id: &str,
    definitions: &[PlanNodeDef],
    window: EvaluationWindow,
    root: &str,
    timeout_ms: Option<u64>,
    cancel: CancellationToken,
  ) -> Result<RunResult, PipelineError> {
    let plan = self.factory.build(definitions, &window)?;
    let root_node = plan
      .get(root)
      .cloned()
      .ok_or_else(|| PipelineError::UnknownNode {
        node_name: root.to_string(),
      })?;

    let store = Arc::new(ResultStore::new());
    let execution = self.execution(execution_id.to_string(), window, store.clone());
    // Child token so a timeout stops this run without cancelling the caller's.
    let token = cancel.child_token();
    let scope = Scope::root(plan.nodes().clone(), token.clone());
    let run = execution.execute_node(scope, root.to_string(), Vec::new());

    let outcome = match timeout_ms {
      Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), run).await {
        Ok(outcome) => outcome,
        Err(_) => {
          warn!(execution_id = %execution_id, timeout_ms = ms, "pipeline_timed_out");
          Err(PipelineError::Timeout {
            node_name: root.to_string(),
            node_type: root_node.node_type().to_string(),
            timeout_ms: ms,
          })
        }
      },
      None => run.await,
    };

    if let Err(e) = outcome {
      // Stop branch tasks that are still running.
      token.cancel();
      return Err(e);
    }

    Ok(RunResult {
      execution_id: execution_id.to_string(),
      node_name: root.to_string(),
      outputs: store.outputs_of(root_node.instance_name()),
    })
  }

  fn execution(
    &self,
    execution_id: String,
    window: EvaluationWindow,
    store: Arc<ResultStore>,
  ) -> Arc<Execution<N>> {
    Arc::new(Execution {
      execution_id,
      window,
      store,
      factory: self.factory.clone(),
      workers: Semaphore::new(self.config.worker_pool_size.max(1)),
      flights: Mutex::new(HashMap::new()),
      default_policy: self.config.failure_policy,
      notifier: self.notifier.clone(),
    })
  }
}

/// State shared by every task of one execution.
struct Execution<N> {
  execution_id: String,
  window: EvaluationWindow,
  store: Arc<ResultStore>,
  factory: PlanNodeFactory,
  /// Bounds concurrently executing operators. Held only around `execute`.
  workers: Semaphore,
  /// One cell per node instance so concurrent requests share a single run.
  flights: Mutex<HashMap<String, Arc<OnceCell<Result<(), PipelineError>>>>>,
  default_policy: FailurePolicy,
  notifier: Arc<N>,
}

/// Everything a spawned branch needs to instantiate and run its nodes.
struct Branch {
  parent: Arc<Scope>,
  templates: Arc<Vec<Arc<PlanNode>>>,
  item: Params,
  fork_name: String,
  index: usize,
  root: String,
  root_output: Option<String>,
  cancel: CancellationToken,
}

impl<N: ExecutionNotifier + 'static> Execution<N> {
  /// Resolve `name` in `scope` and make sure its outputs are stored.
  fn execute_node(
    self: Arc<Self>,
    scope: Arc<Scope>,
    name: String,
    stack: Vec<String>,
  ) -> NodeFuture {
    Box::pin(async move {
      let (node, owner) = scope
        .resolve(&name)
        .ok_or_else(|| PipelineError::UnknownNode { node_name: name })?;
      let instance = node.instance_name().to_string();

      if let Some(start) = stack.iter().position(|n| *n == instance) {
        let mut path = stack[start..].to_vec();
        path.push(instance);
        return Err(PipelineError::Cycle { path });
      }

      if self.store.contains_all(&instance, node.output_keys()) {
        debug!(node = %instance, "node_memoized");
        return Ok(node);
      }

      let cell = self.flight(&instance);
      let mut stack = stack;
      stack.push(instance);
      let outcome = cell
        .get_or_init(|| self.clone().run_node(owner, node.clone(), stack))
        .await;
      outcome.clone().map(|()| node)
    })
  }

  fn flight(&self, instance: &str) -> Arc<OnceCell<Result<(), PipelineError>>> {
    let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
    flights.entry(instance.to_string()).or_default().clone()
  }

  fn run_node(
    self: Arc<Self>,
    scope: Arc<Scope>,
    node: Arc<PlanNode>,
    stack: Vec<String>,
  ) -> UnitFuture {
    Box::pin(async move {
      let cancel = scope.cancel_token().clone();
      if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
      }

      let inputs = self.gather_inputs(&scope, &node, &stack).await?;

      let outcome = match node.kind() {
        NodeKind::Operator { .. } => match self.invoke(&node, inputs, &cancel).await {
          Ok(outputs) => self.store_outputs(node.instance_name(), outputs),
          Err(e) => Err(e),
        },
        NodeKind::ForkJoin(spec) => self.fork_join(&scope, &node, spec, &stack).await,
      };

      if let Err(e) = &outcome {
        if !matches!(e, PipelineError::Cancelled) {
          error!(
            execution_id = %self.execution_id,
            node = %node.instance_name(),
            node_type = %node.node_type(),
            error = %e,
            "node_failed"
          );
        }
        self.notifier.notify(ExecutionEvent::NodeFailed {
          execution_id: self.execution_id.clone(),
          node_name: node.instance_name().to_string(),
          error: e.to_string(),
        });
      }
      outcome
    })
  }

  /// Run every upstream dependency of `node` and collect its inputs.
  async fn gather_inputs(
    self: &Arc<Self>,
    scope: &Arc<Scope>,
    node: &PlanNode,
    stack: &[String],
  ) -> Result<OperatorInputs, PipelineError> {
    let bindings = &node.def().inputs;
    let upstream = futures::future::try_join_all(bindings.iter().map(|binding| {
      self
        .clone()
        .execute_node(scope.clone(), binding.source_node.clone(), stack.to_vec())
    }))
    .await?;

    let mut inputs = OperatorInputs::with_capacity(bindings.len());
    for (binding, source) in bindings.iter().zip(upstream) {
      let key = ContextKey::new(source.instance_name(), binding.source_output.as_str());
      let result = self
        .store
        .get(&key)
        .ok_or_else(|| internal(format!("no result for {}", key)))?;
      inputs.insert(binding.local_key.clone(), result);
    }
    Ok(inputs)
  }

  /// Invoke an operator node once, holding a worker permit while it runs.
  async fn invoke(
    &self,
    node: &PlanNode,
    inputs: OperatorInputs,
    cancel: &CancellationToken,
  ) -> Result<OperatorOutputs, PipelineError> {
    let NodeKind::Operator { operator, .. } = node.kind() else {
      return Err(internal(format!(
        "node '{}' has no operator",
        node.instance_name()
      )));
    };

    info!(
      execution_id = %self.execution_id,
      node = %node.instance_name(),
      node_type = %node.node_type(),
      "node_started"
    );
    self.notifier.notify(ExecutionEvent::NodeStarted {
      execution_id: self.execution_id.clone(),
      node_name: node.instance_name().to_string(),
      node_type: node.node_type().to_string(),
    });

    // Cancellation is polled first so a cancelled node never starts executing.
    let permit = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
      permit = self.workers.acquire() => {
        permit.map_err(|e| internal(format!("worker pool closed: {}", e)))?
      }
    };
    let outputs = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
      outputs = operator.execute(inputs) => outputs,
    };
    drop(permit);

    let execution_error = |source: OperatorError| PipelineError::Execution {
      node_name: node.instance_name().to_string(),
      node_type: node.node_type().to_string(),
      source,
    };
    let outputs = outputs.map_err(execution_error)?;
    if let Some(key) = node.output_keys().iter().find(|k| !outputs.contains_key(*k)) {
      return Err(execution_error(OperatorError::MissingOutput { key: key.clone() }));
    }
    Ok(outputs)
  }

  fn store_outputs(&self, instance: &str, outputs: OperatorOutputs) -> Result<(), PipelineError> {
    let mut keys: Vec<String> = outputs.keys().cloned().collect();
    keys.sort_unstable();

    self.store.put_outputs(instance, outputs).map_err(|e| {
      error!(execution_id = %self.execution_id, error = %e, "result_store_conflict");
      internal(e.to_string())
    })?;

    info!(
      execution_id = %self.execution_id,
      node = %instance,
      outputs = ?keys,
      "node_completed"
    );
    self.notifier.notify(ExecutionEvent::NodeCompleted {
      execution_id: self.execution_id.clone(),
      node_name: instance.to_string(),
      outputs: keys,
    });
    Ok(())
  }

  /// Expand a fork-join over its enumeration, run the branches, and combine.
  async fn fork_join(
    self: &Arc<Self>,
    scope: &Arc<Scope>,
    node: &PlanNode,
    spec: &ForkJoinSpec,
    stack: &[String],
  ) -> Result<(), PipelineError> {
    let fork_name = node.instance_name().to_string();

    let enumerator = self
      .clone()
      .execute_node(scope.clone(), spec.enumerator.clone(), stack.to_vec())
      .await?;
    let key = ContextKey::new(enumerator.instance_name(), spec.enumeration_output.as_str());
    let produced = self
      .store
      .get(&key)
      .ok_or_else(|| internal(format!("no result for {}", key)))?;
    let enumeration = produced
      .as_enumeration()
      .ok_or_else(|| PipelineError::Execution {
        node_name: fork_name.clone(),
        node_type: FORK_JOIN_TYPE.to_string(),
        source: OperatorError::InvalidInput {
          key: spec.enumeration_output.clone(),
          expected: "enumeration",
          actual: produced.kind(),
        },
      })?;

    let (combiner, combiner_scope) =
      scope
        .resolve(&spec.combiner)
        .ok_or_else(|| PipelineError::UnknownNode {
          node_name: spec.combiner.clone(),
        })?;
    let mut combiner_inputs = self.gather_inputs(&combiner_scope, &combiner, stack).await?;

    let templates = Arc::new(branch_templates(scope, &spec.root)?);
    let root_type = templates
      .iter()
      .find(|t| t.name() == spec.root)
      .map(|t| t.node_type().to_string())
      .unwrap_or_default();
    let policy = spec.failure_policy.unwrap_or(self.default_policy);
    let cancel = scope.cancel_token().child_token();

    info!(
      execution_id = %self.execution_id,
      node = %fork_name,
      branches = enumeration.len(),
      instantiated = templates.len(),
      policy = ?policy,
      "fork_join_started"
    );
    self.notifier.notify(ExecutionEvent::ForkStarted {
      execution_id: self.execution_id.clone(),
      node_name: fork_name.clone(),
      branches: enumeration.len(),
    });

    let mut aborts = Vec::with_capacity(enumeration.len());
    let mut pending = FuturesUnordered::new();
    for (index, item) in enumeration.items.iter().enumerate() {
      let branch_name = instance_name(&spec.root, &fork_name, index);
      let branch = Branch {
        parent: scope.clone(),
        templates: templates.clone(),
        item: item.params.clone(),
        fork_name: fork_name.clone(),
        index,
        root: spec.root.clone(),
        root_output: spec.root_output.clone(),
        cancel: cancel.clone(),
      };
      let handle = tokio::spawn(self.clone().run_branch(branch, stack.to_vec()));
      aborts.push(handle.abort_handle());
      pending.push(async move { (index, branch_name, handle.await) });
    }

    // Keyed by enumeration index so the combiner sees branches in item order.
    let mut results: BTreeMap<usize, (String, Arc<PipelineResult>)> = BTreeMap::new();
    let mut succeeded = 0;
    loop {
      let next = tokio::select! {
        next = pending.next() => next,
        _ = cancel.cancelled() => {
          aborts.iter().for_each(|a| a.abort());
          return Err(PipelineError::Cancelled);
        }
      };
      let Some((index, branch, joined)) = next else {
        break;
      };

      let outcome = joined
        .unwrap_or_else(|e| Err(internal(format!("branch task {} failed: {}", branch, e))));
      match outcome {
        Ok(result) => {
          succeeded += 1;
          debug!(node = %fork_name, branch = %branch, "branch_completed");
          self.notifier.notify(ExecutionEvent::BranchCompleted {
            execution_id: self.execution_id.clone(),
            node_name: fork_name.clone(),
            branch: branch.clone(),
          });
          results.insert(index, (branch, result));
        }
        Err(_) if cancel.is_cancelled() => {
          aborts.iter().for_each(|a| a.abort());
          return Err(PipelineError::Cancelled);
        }
        Err(err) => {
          warn!(
            execution_id = %self.execution_id,
            node = %fork_name,
            branch = %branch,
            error = %err,
            "branch_failed"
          );
          self.notifier.notify(ExecutionEvent::BranchFailed {
            execution_id: self.execution_id.clone(),
            node_name: fork_name.clone(),
            branch: branch.clone(),
            error: err.to_string(),
          });

          match policy {
            FailurePolicy::FailFast => {
              cancel.cancel();
              aborts.iter().for_each(|a| a.abort());
              return Err(PipelineError::BranchFailed {
                node_name: fork_name,
                node_type: FORK_JOIN_TYPE.to_string(),
                branch,
                source: Box::new(err),
              });
            }
            FailurePolicy::BestEffort => {
              let failure = BranchFailure {
                node_name: err.node_name().unwrap_or(&branch).to_string(),
                node_type: err.node_type().unwrap_or(&root_type).to_string(),
                message: err.to_string(),
              };
              let failure = Arc::new(PipelineResult::Failure(failure));
              results.insert(index, (branch, failure));
            }
          }
        }
      }
    }

    if succeeded < spec.min_successful_branches {
      return Err(PipelineError::InsufficientBranches {
        node_name: fork_name,
        succeeded,
        required: spec.min_successful_branches,
      });
    }

    // A fresh combiner instance whose outputs belong to the fork-join.
    let params = substitute_params(&combiner.def().params, scope.properties());
    let instance = self
      .factory
      .instantiate(&combiner, fork_name.clone(), params, &self.window)?;
    let failed = results.len() - succeeded;
    combiner_inputs.extend(results.into_values());
    let outputs = self
      .invoke(&instance, combiner_inputs, scope.cancel_token())
      .await?;
    self.store_outputs(&fork_name, outputs)?;

    info!(
      execution_id = %self.execution_id,
      node = %fork_name,
      succeeded,
      failed,
      "fork_join_completed"
    );
    Ok(())
  }

  /// Instantiate one branch's nodes and run its root.
  fn run_branch(self: Arc<Self>, branch: Branch, stack: Vec<String>) -> BranchFuture {
    Box::pin(async move {
      let properties = merge_properties(branch.parent.properties(), &branch.item);

      let mut nodes = HashMap::with_capacity(branch.templates.len());
      for template in branch.templates.iter() {
        let name = instance_name(template.name(), &branch.fork_name, branch.index);
        let params = substitute_params(&template.def().params, &properties);
        let node = self
          .factory
          .instantiate(template, name, params, &self.window)?;
        nodes.insert(template.name().to_string(), Arc::new(node));
      }

      let scope = Scope::branch(&branch.parent, nodes, properties, branch.cancel);
      let root = self
        .clone()
        .execute_node(scope, branch.root.clone(), stack)
        .await?;

      let output = branch
        .root_output
        .as_deref()
        .or_else(|| root.output_keys().first().map(String::as_str))
        .ok_or_else(|| internal(format!("branch root '{}' has no outputs", branch.root)))?;
      let key = ContextKey::new(root.instance_name(), output);
      self
        .store
        .get(&key)
        .ok_or_else(|| internal(format!("no result for {}", key)))
    })
  }
}

/// The nodes a fork-join must re-create for each branch, dependencies first.
///
/// Walks the closure of `root` and keeps every node that depends on the
/// branch item: the root itself, nested fork-joins, nodes with placeholders
/// in their parameters, and anything downstream of those. The rest is shared
/// with the enclosing scope.
fn branch_templates(scope: &Arc<Scope>, root: &str) -> Result<Vec<Arc<PlanNode>>, PipelineError> {
  fn visit(
    scope: &Arc<Scope>,
    name: &str,
    root: &str,
    dependent: &mut HashMap<String, bool>,
    order: &mut Vec<Arc<PlanNode>>,
  ) -> Result<bool, PipelineError> {
    if let Some(&known) = dependent.get(name) {
      return Ok(known);
    }
    let (node, _) = scope.resolve(name).ok_or_else(|| PipelineError::UnknownNode {
      node_name: name.to_string(),
    })?;
    // Plans are acyclic, so this provisional entry is never read back.
    dependent.insert(name.to_string(), false);

    let mut is_dependent = name == root
      || node.is_fork_join()
      || node.def().params.values().any(has_placeholders);
    for next in node.closure_refs() {
      is_dependent |= visit(scope, next, root, dependent, order)?;
    }

    dependent.insert(name.to_string(), is_dependent);
    if is_dependent {
      order.push(node);
    }
    Ok(is_dependent)
  }

  let mut dependent = HashMap::new();
  let mut order = Vec::new();
  visit(scope, root, root, &mut dependent, &mut order)?;
  Ok(order)
}

fn internal(message: impl Into<String>) -> PipelineError {
  PipelineError::Internal {
    message: message.into(),
  }
}
