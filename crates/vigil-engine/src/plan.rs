//! Runnable plan nodes and the factory that builds them.
//!
//! [`PlanNodeFactory::build`] turns a flat list of [`PlanNodeDef`]s into a
//! [`PlanNodeMap`]: every type is resolved against the registry once, every
//! operator is created and initialized, and references and cycles are
//! checked. Nothing is executed. Fork-join branches later call
//! [`PlanNodeFactory::instantiate`] to stamp out fresh node instances from
//! the built templates.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use vigil_config::{EvaluationWindow, FailurePolicy, Params, PlanNodeDef};
use vigil_operator::params::{optional_str, optional_usize, required_str};
use vigil_operator::{
  Collaborators, Operator, OperatorContext, OperatorError, OperatorFactory, OperatorRegistry,
};

use crate::error::PipelineError;
use crate::graph::PlanGraph;

/// Node type handled by the engine itself rather than the registry.
pub const FORK_JOIN_TYPE: &str = "ForkJoin";

/// Characters reserved for synthesized branch instance names.
const RESERVED_CHARS: [char; 3] = ['@', '[', ']'];

/// Instance name of `node` inside branch `index` of fork-join `fork_join`.
///
/// Node names cannot contain the reserved characters, so distinct
/// `(node, fork_join, index)` triples always give distinct names.
pub fn instance_name(node: &str, fork_join: &str, index: usize) -> String {
  format!("{}@{}[{}]", node, fork_join, index)
}

/// Parameters of a fork-join node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkJoinSpec {
  /// Node producing the enumeration.
  pub enumerator: String,
  pub enumeration_output: String,
  /// Node whose output forms each branch's value.
  pub root: String,
  /// Output of the root to collect; its first declared output when unset.
  pub root_output: Option<String>,
  /// Node whose operator combines the branch values.
  pub combiner: String,
  /// Overrides the engine default when set.
  pub failure_policy: Option<FailurePolicy>,
  pub min_successful_branches: usize,
}

impl ForkJoinSpec {
  pub const ENUMERATOR: &'static str = "enumerator";
  pub const ENUMERATION_OUTPUT: &'static str = "enumeration_output";
  pub const ROOT: &'static str = "root";
  pub const ROOT_OUTPUT: &'static str = "root_output";
  pub const COMBINER: &'static str = "combiner";
  pub const FAILURE_POLICY: &'static str = "failure_policy";
  pub const MIN_SUCCESSFUL_BRANCHES: &'static str = "min_successful_branches";

  pub fn from_params(node_name: &str, params: &Params) -> Result<Self, PipelineError> {
    let invalid = |e: OperatorError| invalid_params(node_name, FORK_JOIN_TYPE, &e);

    let failure_policy = match optional_str(params, Self::FAILURE_POLICY).map_err(invalid)? {
      Some(value) => Some(FailurePolicy::parse(value).ok_or_else(|| {
        PipelineError::InvalidParams {
          node_name: node_name.to_string(),
          node_type: FORK_JOIN_TYPE.to_string(),
          message: format!("unknown failure policy '{}'", value),
        }
      })?),
      None => None,
    };

    Ok(Self {
      enumerator: required_str(params, Self::ENUMERATOR)
        .map_err(invalid)?
        .to_string(),
      enumeration_output: optional_str(params, Self::ENUMERATION_OUTPUT)
        .map_err(invalid)?
        .unwrap_or("enumeration")
        .to_string(),
      root: required_str(params, Self::ROOT)
        .map_err(invalid)?
        .to_string(),
      root_output: optional_str(params, Self::ROOT_OUTPUT)
        .map_err(invalid)?
        .map(str::to_string),
      combiner: required_str(params, Self::COMBINER)
        .map_err(invalid)?
        .to_string(),
      failure_policy,
      min_successful_branches: optional_usize(params, Self::MIN_SUCCESSFUL_BRANCHES)
        .map_err(invalid)?
        .unwrap_or(0),
    })
  }
}

/// What a node does when executed.
pub enum NodeKind {
  /// An initialized operator, plus the factory that made it so branches can
  /// create fresh instances without querying the registry again.
  Operator {
    operator: Box<dyn Operator>,
    factory: Arc<dyn OperatorFactory>,
  },
  ForkJoin(ForkJoinSpec),
}

/// A runnable node instance. Immutable after construction.
pub struct PlanNode {
  def: Arc<PlanNodeDef>,
  instance_name: String,
  params: Params,
  output_keys: Vec<String>,
  kind: NodeKind,
}

impl PlanNode {
  /// Definition name, shared by every instance of the node.
  pub fn name(&self) -> &str {
    &self.def.name
  }

  /// Name results are stored under. Equals [`Self::name`] outside branches.
  pub fn instance_name(&self) -> &str {
    &self.instance_name
  }

  pub fn node_type(&self) -> &str {
    &self.def.node_type
  }

  /// The definition, with parameters as written.
  pub fn def(&self) -> &PlanNodeDef {
    &self.def
  }

  /// Effective parameters after placeholder substitution.
  pub fn params(&self) -> &Params {
    &self.params
  }

  /// Declared outputs. A fork-join declares its combiner's outputs.
  pub fn output_keys(&self) -> &[String] {
    &self.output_keys
  }

  pub fn kind(&self) -> &NodeKind {
    &self.kind
  }

  pub fn fork_join(&self) -> Option<&ForkJoinSpec> {
    match &self.kind {
      NodeKind::ForkJoin(spec) => Some(spec),
      NodeKind::Operator { .. } => None,
    }
  }

  pub fn is_fork_join(&self) -> bool {
    self.fork_join().is_some()
  }

  /// Nodes a branch closure follows from here: static inputs, plus the
  /// enumerator and combiner of a fork-join. A nested fork-join's root is
  /// expanded by that fork-join itself.
  pub(crate) fn closure_refs(&self) -> Vec<&str> {
    let mut refs: Vec<&str> = self
      .def
      .inputs
      .iter()
      .map(|b| b.source_node.as_str())
      .collect();
    if let Some(spec) = self.fork_join() {
      refs.push(&spec.enumerator);
      refs.push(&spec.combiner);
    }
    refs
  }
}

impl fmt::Debug for PlanNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PlanNode")
      .field("instance_name", &self.instance_name)
      .field("node_type", &self.def.node_type)
      .field("output_keys", &self.output_keys)
      .finish()
  }
}

/// The root-scope nodes of a built plan, keyed by name.
#[derive(Debug, Clone)]
pub struct PlanNodeMap {
  nodes: HashMap<String, Arc<PlanNode>>,
  window: EvaluationWindow,
}

impl PlanNodeMap {
  pub fn get(&self, name: &str) -> Option<&Arc<PlanNode>> {
    self.nodes.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.nodes.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Node names, sorted.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  /// The evaluation window the operators were initialized with.
  pub fn window(&self) -> &EvaluationWindow {
    &self.window
  }

  pub(crate) fn nodes(&self) -> &HashMap<String, Arc<PlanNode>> {
    &self.nodes
  }
}

/// Builds plan nodes from definitions and injects collaborators.
#[derive(Clone)]
pub struct PlanNodeFactory {
  registry: Arc<dyn OperatorRegistry>,
  collaborators: Collaborators,
}

impl PlanNodeFactory {
  pub fn new(registry: Arc<dyn OperatorRegistry>, collaborators: Collaborators) -> Self {
    Self {
      registry,
      collaborators,
    }
  }

  /// Validate definitions and build the root-scope node map.
  #[instrument(name = "plan_build", skip_all, fields(nodes = definitions.len()))]
  pub fn build(
    &self,
    definitions: &[PlanNodeDef],
    window: &EvaluationWindow,
  ) -> Result<PlanNodeMap, PipelineError> {
    validate_names(definitions)?;
    let factories = self.resolve_types(definitions)?;

    // Operators first: a fork-join declares its combiner's outputs.
    let mut nodes: HashMap<String, PlanNode> = HashMap::with_capacity(definitions.len());
    for def in definitions.iter().filter(|d| d.node_type != FORK_JOIN_TYPE) {
      let factory = factories
        .get(&def.node_type)
        .cloned()
        .ok_or_else(|| PipelineError::UnknownOperatorType {
          node_name: def.name.clone(),
          node_type: def.node_type.clone(),
        })?;
      let node = self.create_operator_node(
        Arc::new(def.clone()),
        def.name.clone(),
        def.params.clone(),
        factory,
        window,
      )?;
      nodes.insert(def.name.clone(), node);
    }

    for def in definitions.iter().filter(|d| d.node_type == FORK_JOIN_TYPE) {
      let spec = ForkJoinSpec::from_params(&def.name, &def.params)?;
      let output_keys = match nodes.get(&spec.combiner) {
        Some(combiner) => combiner.output_keys.clone(),
        None if definitions.iter().any(|d| d.name == spec.combiner) => {
          return Err(PipelineError::InvalidParams {
            node_name: def.name.clone(),
            node_type: FORK_JOIN_TYPE.to_string(),
            message: format!("combiner '{}' must be an operator node", spec.combiner),
          });
        }
        None => {
          return Err(PipelineError::DanglingReference {
            node_name: def.name.clone(),
            node_type: FORK_JOIN_TYPE.to_string(),
            message: format!("combiner '{}' does not exist", spec.combiner),
          });
        }
      };
      nodes.insert(
        def.name.clone(),
        PlanNode {
          def: Arc::new(def.clone()),
          instance_name: def.name.clone(),
          params: def.params.clone(),
          output_keys,
          kind: NodeKind::ForkJoin(spec),
        },
      );
    }

    validate_references(definitions, &nodes)?;
    detect_cycle(definitions, &nodes)?;

    info!(nodes = nodes.len(), "plan_built");
    Ok(PlanNodeMap {
      nodes: nodes
        .into_iter()
        .map(|(name, node)| (name, Arc::new(node)))
        .collect(),
      window: *window,
    })
  }

  /// Create a fresh instance of `template` for a fork-join branch.
  ///
  /// Uses the operator factory captured when the template was built.
  pub fn instantiate(
    &self,
    template: &PlanNode,
    instance_name: String,
    params: Params,
    window: &EvaluationWindow,
  ) -> Result<PlanNode, PipelineError> {
    match &template.kind {
      NodeKind::Operator { factory, .. } => self.create_operator_node(
        template.def.clone(),
        instance_name,
        params,
        factory.clone(),
        window,
      ),
      NodeKind::ForkJoin(_) => {
        let spec = ForkJoinSpec::from_params(&instance_name, &params)?;
        Ok(PlanNode {
          def: template.def.clone(),
          instance_name,
          params,
          output_keys: template.output_keys.clone(),
          kind: NodeKind::ForkJoin(spec),
        })
      }
    }
  }

  fn resolve_types(
    &self,
    definitions: &[PlanNodeDef],
  ) -> Result<HashMap<String, Arc<dyn OperatorFactory>>, PipelineError> {
    let mut factories: HashMap<String, Arc<dyn OperatorFactory>> = HashMap::new();
    for def in definitions {
      if def.node_type == FORK_JOIN_TYPE || factories.contains_key(&def.node_type) {
        continue;
      }
      let factory =
        self
          .registry
          .resolve(&def.node_type)
          .ok_or_else(|| PipelineError::UnknownOperatorType {
            node_name: def.name.clone(),
            node_type: def.node_type.clone(),
          })?;
      debug!(node_type = %def.node_type, "operator_type_resolved");
      factories.insert(def.node_type.clone(), factory);
    }
    Ok(factories)
  }

  fn create_operator_node(
    &self,
    def: Arc<PlanNodeDef>,
    instance_name: String,
    params: Params,
    factory: Arc<dyn OperatorFactory>,
    window: &EvaluationWindow,
  ) -> Result<PlanNode, PipelineError> {
    let mut operator = factory.create();
    let ctx = OperatorContext {
      node_name: &instance_name,
      node_type: &def.node_type,
      params: &params,
      window,
      collaborators: &self.collaborators,
    };
    operator
      .init(&ctx)
      .map_err(|e| invalid_params(&instance_name, &def.node_type, &e))?;

    let output_keys = operator.output_keys();
    if output_keys.is_empty() {
      return Err(PipelineError::InvalidParams {
        node_name: instance_name,
        node_type: def.node_type.clone(),
        message: "operator declares no outputs".to_string(),
      });
    }

    Ok(PlanNode {
      def,
      instance_name,
      params,
      output_keys,
      kind: NodeKind::Operator { operator, factory },
    })
  }
}

fn invalid_params(node_name: &str, node_type: &str, error: &OperatorError) -> PipelineError {
  let message = match error {
    OperatorError::Configuration { message } => message.clone(),
    other => other.to_string(),
  };
  PipelineError::InvalidParams {
    node_name: node_name.to_string(),
    node_type: node_type.to_string(),
    message,
  }
}

fn validate_names(definitions: &[PlanNodeDef]) -> Result<(), PipelineError> {
  let mut seen = HashSet::new();
  for def in definitions {
    if def.name.is_empty() {
      return Err(PipelineError::InvalidNodeName {
        node_name: def.name.clone(),
        reason: "name is empty".to_string(),
      });
    }
    if let Some(c) = def.name.chars().find(|c| RESERVED_CHARS.contains(c)) {
      return Err(PipelineError::InvalidNodeName {
        node_name: def.name.clone(),
        reason: format!("'{}' is reserved for branch instance names", c),
      });
    }
    if !seen.insert(def.name.as_str()) {
      return Err(PipelineError::DuplicateNode {
        node_name: def.name.clone(),
      });
    }
    // Combiner inputs share a map with branch results keyed by instance name.
    for binding in &def.inputs {
      if let Some(c) = binding.local_key.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(PipelineError::InvalidParams {
          node_name: def.name.clone(),
          node_type: def.node_type.clone(),
          message: format!(
            "input key '{}' uses '{}', which is reserved for branch instance names",
            binding.local_key, c
          ),
        });
      }
    }
  }
  Ok(())
}

fn validate_references(
  definitions: &[PlanNodeDef],
  nodes: &HashMap<String, PlanNode>,
) -> Result<(), PipelineError> {
  let check = |def: &PlanNodeDef, role: &str, target: &str, output: Option<&str>| {
    let dangling = |message: String| PipelineError::DanglingReference {
      node_name: def.name.clone(),
      node_type: def.node_type.clone(),
      message,
    };
    let Some(node) = nodes.get(target) else {
      return Err(dangling(format!("{} references unknown node '{}'", role, target)));
    };
    match output {
      Some(output) if !node.output_keys.iter().any(|k| k == output) => Err(dangling(format!(
        "{} references undeclared output '{}' of node '{}'",
        role, output, target
      ))),
      _ => Ok(()),
    }
  };

  for def in definitions {
    for binding in &def.inputs {
      let role = format!("input '{}'", binding.local_key);
      check(def, &role, &binding.source_node, Some(&binding.source_output))?;
    }
    if let Some(spec) = nodes.get(&def.name).and_then(PlanNode::fork_join) {
      check(
        def,
        ForkJoinSpec::ENUMERATOR,
        &spec.enumerator,
        Some(&spec.enumeration_output),
      )?;
      check(def, ForkJoinSpec::ROOT, &spec.root, spec.root_output.as_deref())?;
      check(def, ForkJoinSpec::COMBINER, &spec.combiner, None)?;
    }
  }
  Ok(())
}

fn detect_cycle(
  definitions: &[PlanNodeDef],
  nodes: &HashMap<String, PlanNode>,
) -> Result<(), PipelineError> {
  let mut graph = PlanGraph::new();
  for def in definitions {
    graph.add_node(def.name.clone());
    for binding in &def.inputs {
      graph.add_edge(def.name.clone(), binding.source_node.clone());
    }
    if let Some(spec) = nodes.get(&def.name).and_then(PlanNode::fork_join) {
      graph.add_edge(def.name.clone(), spec.enumerator.clone());
      graph.add_edge(def.name.clone(), spec.root.clone());
      graph.add_edge(def.name.clone(), spec.combiner.clone());
    }
  }
  match graph.find_cycle() {
    Some(path) => Err(PipelineError::Cycle { path }),
    None => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use vigil_config::InputBinding;
  use vigil_operator::StaticRegistry;

  fn factory() -> PlanNodeFactory {
    PlanNodeFactory::new(
      Arc::new(StaticRegistry::with_builtins()),
      Collaborators::new(),
    )
  }

  fn window() -> EvaluationWindow {
    EvaluationWindow::from_millis(0, 60_000).unwrap()
  }

  fn echo(name: &str, text: &str) -> PlanNodeDef {
    PlanNodeDef::new(name, "Echo").with_param("echo", json!(text))
  }

  fn fork_join_defs() -> Vec<PlanNodeDef> {
    vec![
      PlanNodeDef::new("enumerator", "Enumerator")
        .with_param("items", json!([{ "key": "1" }, { "key": "2" }])),
      echo("echo", "${key}"),
      PlanNodeDef::new("combiner", "Combiner"),
      PlanNodeDef::new("fork", FORK_JOIN_TYPE)
        .with_param("enumerator", json!("enumerator"))
        .with_param("root", json!("echo"))
        .with_param("combiner", json!("combiner")),
    ]
  }

  #[test]
  fn test_build_simple_plan() {
    let plan = factory()
      .build(
        &[
          echo("a", "hi"),
          PlanNodeDef::new("c", "Combiner").with_input(InputBinding::new("a", "result", "a")),
        ],
        &window(),
      )
      .unwrap();
    assert_eq!(plan.names(), vec!["a", "c"]);
    let a = plan.get("a").unwrap();
    assert_eq!(a.instance_name(), "a");
    assert_eq!(a.output_keys(), ["result".to_string()]);
    assert!(!a.is_fork_join());
  }

  #[test]
  fn test_fork_join_declares_combiner_outputs() {
    let plan = factory().build(&fork_join_defs(), &window()).unwrap();
    let fork = plan.get("fork").unwrap();
    assert_eq!(fork.output_keys(), ["combiner".to_string()]);
    let spec = fork.fork_join().unwrap();
    assert_eq!(spec.enumeration_output, "enumeration");
    assert_eq!(spec.failure_policy, None);
    assert_eq!(spec.min_successful_branches, 0);
  }

  #[test]
  fn test_rejects_duplicate_and_reserved_names() {
    let err = factory()
      .build(&[echo("a", "x"), echo("a", "y")], &window())
      .unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateNode { node_name } if node_name == "a"));

    for name in ["a@b", "a[0]", ""] {
      let err = factory().build(&[echo(name, "x")], &window()).unwrap_err();
      assert!(matches!(err, PipelineError::InvalidNodeName { .. }), "{}", name);
    }
  }

  #[test]
  fn test_rejects_reserved_input_keys() {
    let defs = vec![
      echo("a", "x"),
      PlanNodeDef::new("c", "Combiner").with_input(InputBinding::new("a", "result", "a@fork[0]")),
    ];
    let err = factory().build(&defs, &window()).unwrap_err();
    assert!(matches!(
      err,
      PipelineError::InvalidParams { ref node_name, .. } if node_name == "c"
    ));
  }

  #[test]
  fn test_rejects_unknown_type() {
    let err = factory()
      .build(&[PlanNodeDef::new("x", "Nope")], &window())
      .unwrap_err();
    assert!(matches!(
      err,
      PipelineError::UnknownOperatorType { node_type, .. } if node_type == "Nope"
    ));
  }

  #[test]
  fn test_rejects_dangling_references() {
    let missing_node =
      PlanNodeDef::new("c", "Combiner").with_input(InputBinding::new("ghost", "result", "in"));
    let err = factory().build(&[missing_node], &window()).unwrap_err();
    assert!(matches!(err, PipelineError::DanglingReference { .. }));

    let missing_output = vec![
      echo("a", "x"),
      PlanNodeDef::new("c", "Combiner").with_input(InputBinding::new("a", "table", "in")),
    ];
    let err = factory().build(&missing_output, &window()).unwrap_err();
    assert!(err.to_string().contains("undeclared output 'table'"));

    let mut defs = fork_join_defs();
    defs[3] = defs[3].clone().with_param("root", json!("ghost"));
    let err = factory().build(&defs, &window()).unwrap_err();
    assert!(matches!(
      err,
      PipelineError::DanglingReference { node_name, .. } if node_name == "fork"
    ));
  }

  #[test]
  fn test_rejects_bad_operator_params() {
    let err = factory()
      .build(&[PlanNodeDef::new("e", "Echo")], &window())
      .unwrap_err();
    assert!(matches!(
      err,
      PipelineError::InvalidParams { node_name, node_type, .. }
        if node_name == "e" && node_type == "Echo"
    ));
  }

  #[test]
  fn test_rejects_bad_fork_join_params() {
    let mut defs = fork_join_defs();
    defs[3] = defs[3].clone().with_param("failure_policy", json!("sometimes"));
    let err = factory().build(&defs, &window()).unwrap_err();
    assert!(err.to_string().contains("unknown failure policy"));

    let mut defs = fork_join_defs();
    defs[3].params.remove("combiner");
    assert!(matches!(
      factory().build(&defs, &window()).unwrap_err(),
      PipelineError::InvalidParams { .. }
    ));
  }

  #[test]
  fn test_rejects_static_cycle() {
    let defs = vec![
      PlanNodeDef::new("a", "Combiner").with_input(InputBinding::new("b", "combiner", "b")),
      PlanNodeDef::new("b", "Combiner").with_input(InputBinding::new("a", "combiner", "a")),
    ];
    let err = factory().build(&defs, &window()).unwrap_err();
    assert!(matches!(err, PipelineError::Cycle { path } if path.len() == 3));
  }

  #[test]
  fn test_rejects_fork_join_reaching_itself() {
    let mut defs = fork_join_defs();
    defs[1] = PlanNodeDef::new("echo", "Combiner")
      .with_input(InputBinding::new("fork", "combiner", "inner"));
    defs[3] = defs[3].clone().with_param("root", json!("echo"));
    let err = factory().build(&defs, &window()).unwrap_err();
    assert!(matches!(err, PipelineError::Cycle { .. }));
  }

  #[test]
  fn test_instantiate_creates_named_instance() {
    let factory = factory();
    let plan = factory.build(&fork_join_defs(), &window()).unwrap();
    let template = plan.get("echo").unwrap();
    let params = json!({ "echo": "1" }).as_object().cloned().unwrap();

    let name = instance_name("echo", "fork", 0);
    let node = factory
      .instantiate(template, name.clone(), params, &window())
      .unwrap();
    assert_eq!(node.instance_name(), "echo@fork[0]");
    assert_eq!(node.name(), "echo");
    assert_eq!(node.params()["echo"], json!("1"));
    assert_eq!(node.def().params["echo"], json!("${key}"));
  }

  #[test]
  fn test_instance_names_are_distinct() {
    assert_ne!(instance_name("a", "b", 1), instance_name("a", "b", 11));
    assert_eq!(
      instance_name("leaf", &instance_name("inner", "outer", 1), 2),
      "leaf@inner@outer[1][2]"
    );
  }
}
