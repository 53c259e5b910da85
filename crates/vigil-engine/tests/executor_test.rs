//! Integration tests for PlanExecutor using built-in and counting operators.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use vigil_config::{EvaluationWindow, InputBinding, PipelineDef, PlanNodeDef};
use vigil_engine::{
  ContextKey, EngineConfig, ErrorKind, ExecutionEvent, PipelineError, PlanExecutor, ResultStore,
};
use vigil_operator::{
  CollaboratorError, Collaborators, DataRequest, DataSourceCache, Operator, OperatorContext,
  OperatorError, OperatorInputs, OperatorOutputs, StaticRegistry,
};
use vigil_result::{Column, ColumnType, DataTable, PipelineResult};

/// Counters shared by every counting echo of one test.
#[derive(Default)]
struct Stats {
  executions: AtomicUsize,
  finished: AtomicUsize,
  running: AtomicUsize,
  max_running: AtomicUsize,
}

/// Echo that counts executions, can sleep, and fails when asked to echo
/// `"boom"`.
struct CountingEcho {
  stats: Arc<Stats>,
  text: String,
  sleep_ms: u64,
}

#[async_trait]
impl Operator for CountingEcho {
  fn init(&mut self, ctx: &OperatorContext<'_>) -> Result<(), OperatorError> {
    self.text = match ctx.params.get("echo") {
      Some(Value::String(s)) => s.clone(),
      Some(other) => other.to_string(),
      None => return Err(OperatorError::configuration("missing 'echo'")),
    };
    self.sleep_ms = ctx.params.get("sleep_ms").and_then(Value::as_u64).unwrap_or(0);
    Ok(())
  }

  fn output_keys(&self) -> Vec<String> {
    vec!["result".to_string()]
  }

  async fn execute(&self, _inputs: OperatorInputs) -> Result<OperatorOutputs, OperatorError> {
    self.stats.executions.fetch_add(1, Ordering::SeqCst);
    let running = self.stats.running.fetch_add(1, Ordering::SeqCst) + 1;
    self.stats.max_running.fetch_max(running, Ordering::SeqCst);
    if self.sleep_ms > 0 {
      tokio::time::sleep(Duration::from_millis(self.sleep_ms)).await;
    }
    self.stats.running.fetch_sub(1, Ordering::SeqCst);
    self.stats.finished.fetch_add(1, Ordering::SeqCst);

    if self.text == "boom" {
      return Err(OperatorError::execution("echo exploded"));
    }
    Ok(HashMap::from([(
      "result".to_string(),
      PipelineResult::echo(self.text.clone()),
    )]))
  }
}

/// Serves a fixed table of metric names.
struct MetricCache;

#[async_trait]
impl DataSourceCache for MetricCache {
  async fn fetch(&self, _request: &DataRequest) -> Result<DataTable, CollaboratorError> {
    let mut table = DataTable::new(vec![Column::new("metric", ColumnType::String)]);
    table.push_row(vec![json!("clicks")]).unwrap();
    table.push_row(vec![json!("views")]).unwrap();
    Ok(table)
  }
}

fn window() -> EvaluationWindow {
  EvaluationWindow::from_millis(1_700_000_000_000, 1_700_003_600_000).unwrap()
}

fn registry(stats: &Arc<Stats>) -> StaticRegistry {
  let mut registry = StaticRegistry::with_builtins();
  let stats = stats.clone();
  registry.register("CountingEcho", move || {
    Box::new(CountingEcho {
      stats: stats.clone(),
      text: String::new(),
      sleep_ms: 0,
    }) as Box<dyn Operator>
  });
  registry
}

fn executor_with(stats: &Arc<Stats>, config: EngineConfig) -> PlanExecutor {
  PlanExecutor::new(Arc::new(registry(stats)), Collaborators::new(), config)
}

fn executor(stats: &Arc<Stats>) -> PlanExecutor {
  executor_with(stats, EngineConfig::default())
}

fn counting(name: &str, text: &str) -> PlanNodeDef {
  PlanNodeDef::new(name, "CountingEcho").with_param("echo", json!(text))
}

fn enumerator(name: &str, items: Value) -> PlanNodeDef {
  PlanNodeDef::new(name, "Enumerator").with_param("items", items)
}

fn combiner(name: &str) -> PlanNodeDef {
  PlanNodeDef::new(name, "Combiner")
}

fn fork_join(name: &str, enumerator: &str, root: &str, combiner: &str) -> PlanNodeDef {
  PlanNodeDef::new(name, "ForkJoin")
    .with_param("enumerator", json!(enumerator))
    .with_param("root", json!(root))
    .with_param("combiner", json!(combiner))
}

fn keyed_items(keys: &[&str]) -> Value {
  Value::Array(keys.iter().map(|k| json!({ "key": k })).collect())
}

/// Fork-join over `keys` whose branch root is a counting echo echoing `${key}`.
fn counting_fork_join(keys: &[&str]) -> Vec<PlanNodeDef> {
  vec![
    enumerator("enumerator", keyed_items(keys)),
    counting("item", "${key}"),
    combiner("combiner"),
    fork_join("fork", "enumerator", "item", "combiner"),
  ]
}

fn echo_texts(result: &PipelineResult) -> BTreeSet<String> {
  result
    .as_combiner()
    .unwrap()
    .results()
    .values()
    .filter_map(|r| r.as_echo().map(|e| e.text.clone()))
    .collect()
}

#[tokio::test]
async fn test_single_echo_stores_one_result() {
  let stats = Arc::new(Stats::default());
  let executor = executor(&stats);
  let defs = vec![PlanNodeDef::new("echo", "Echo").with_param("echo", json!("test_input"))];
  let plan = executor.build_plan(&defs, &window()).unwrap();
  let store = Arc::new(ResultStore::new());

  executor
    .execute_plan_node(&plan, store.clone(), "echo")
    .await
    .unwrap();

  assert_eq!(store.len(), 1);
  let result = store.get(&ContextKey::new("echo", "result")).unwrap();
  assert_eq!(result.as_echo().unwrap().text, "test_input");
}

#[tokio::test]
async fn test_run_returns_root_outputs() {
  let stats = Arc::new(Stats::default());
  let defs = vec![PlanNodeDef::new("echo", "Echo").with_param("echo", json!("hello"))];

  let result = executor(&stats).run(&defs, window(), "echo").await.unwrap();

  assert_eq!(result.node_name, "echo");
  assert!(!result.execution_id.is_empty());
  assert_eq!(result.output("result").unwrap().as_echo().unwrap().text, "hello");
}

#[tokio::test]
async fn test_fork_join_echoes_each_item() {
  let stats = Arc::new(Stats::default());
  let defs = vec![
    enumerator("enumerator", keyed_items(&["1", "2", "3"])),
    PlanNodeDef::new("echo", "Echo").with_param("echo", json!("${key}")),
    combiner("combiner"),
    fork_join("fork", "enumerator", "echo", "combiner"),
  ];

  let result = executor(&stats).run(&defs, window(), "fork").await.unwrap();

  let combined = result.output("combiner").unwrap();
  assert_eq!(combined.as_combiner().unwrap().len(), 3);
  assert_eq!(
    echo_texts(combined),
    BTreeSet::from(["1".to_string(), "2".to_string(), "3".to_string()])
  );
  let keys: Vec<&String> = combined.as_combiner().unwrap().results().keys().collect();
  assert_eq!(keys, vec!["echo@fork[0]", "echo@fork[1]", "echo@fork[2]"]);
}

#[tokio::test]
async fn test_combiner_keeps_enumeration_order() {
  let stats = Arc::new(Stats::default());
  let keys: Vec<String> = (0..12).map(|i| i.to_string()).collect();
  let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
  let defs = counting_fork_join(&key_refs);

  let result = executor(&stats).run(&defs, window(), "fork").await.unwrap();

  let combined = result.output("combiner").unwrap().as_combiner().unwrap();
  let texts: Vec<&str> = combined
    .results()
    .values()
    .map(|r| r.as_echo().unwrap().text())
    .collect();
  assert_eq!(texts, key_refs);
  let names: Vec<&String> = combined.results().keys().collect();
  assert_eq!(names[10], "item@fork[10]");
  assert_eq!(names[11], "item@fork[11]");
}

#[tokio::test]
async fn test_placeholders_outside_fork_join_are_verbatim() {
  let stats = Arc::new(Stats::default());
  let defs = vec![PlanNodeDef::new("echo", "Echo").with_param("echo", json!("${key}"))];

  let result = executor(&stats).run(&defs, window(), "echo").await.unwrap();

  assert_eq!(result.output("result").unwrap().as_echo().unwrap().text, "${key}");
}

#[tokio::test]
async fn test_fan_in_executes_shared_node_once() {
  let stats = Arc::new(Stats::default());
  let defs = vec![
    counting("shared", "x"),
    combiner("left").with_input(InputBinding::new("shared", "result", "x")),
    combiner("right").with_input(InputBinding::new("shared", "result", "x")),
    combiner("join")
      .with_input(InputBinding::new("left", "combiner", "left"))
      .with_input(InputBinding::new("right", "combiner", "right")),
  ];

  let result = executor(&stats).run(&defs, window(), "join").await.unwrap();

  assert_eq!(stats.executions.load(Ordering::SeqCst), 1);
  let joined = result.output("combiner").unwrap().as_combiner().unwrap();
  assert_eq!(joined.len(), 2);
}

#[tokio::test]
async fn test_branch_independent_nodes_are_shared() {
  let stats = Arc::new(Stats::default());
  let defs = vec![
    enumerator("enumerator", keyed_items(&["a", "b", "c"])),
    counting("baseline", "static"),
    combiner("branch_root").with_input(InputBinding::new("baseline", "result", "baseline")),
    combiner("combiner"),
    fork_join("fork", "enumerator", "branch_root", "combiner"),
  ];

  let result = executor(&stats).run(&defs, window(), "fork").await.unwrap();

  assert_eq!(stats.executions.load(Ordering::SeqCst), 1);
  let combined = result.output("combiner").unwrap().as_combiner().unwrap();
  assert_eq!(combined.len(), 3);
  for branch in combined.results().values() {
    let inner = branch.as_combiner().unwrap();
    assert_eq!(inner.get("baseline").unwrap().as_echo().unwrap().text, "static");
  }
}

#[tokio::test]
async fn test_item_dependent_upstream_is_reinstantiated() {
  let stats = Arc::new(Stats::default());
  let defs = vec![
    enumerator("enumerator", keyed_items(&["a", "b", "c"])),
    counting("current", "metric-${key}"),
    combiner("branch_root").with_input(InputBinding::new("current", "result", "current")),
    combiner("combiner"),
    fork_join("fork", "enumerator", "branch_root", "combiner"),
  ];

  let result = executor(&stats).run(&defs, window(), "fork").await.unwrap();

  assert_eq!(stats.executions.load(Ordering::SeqCst), 3);
  let combined = result.output("combiner").unwrap().as_combiner().unwrap();
  let texts: BTreeSet<String> = combined
    .results()
    .values()
    .map(|branch| {
      let inner = branch.as_combiner().unwrap();
      inner.get("current").unwrap().as_echo().unwrap().text.clone()
    })
    .collect();
  assert_eq!(
    texts,
    BTreeSet::from([
      "metric-a".to_string(),
      "metric-b".to_string(),
      "metric-c".to_string()
    ])
  );
}

#[tokio::test]
async fn test_cycle_rejected_before_any_execution() {
  let stats = Arc::new(Stats::default());
  let defs = vec![
    counting("a", "1").with_input(InputBinding::new("b", "result", "b")),
    counting("b", "2").with_input(InputBinding::new("a", "result", "a")),
  ];

  let err = executor(&stats).run(&defs, window(), "a").await.unwrap_err();

  assert!(matches!(err, PipelineError::Cycle { .. }));
  assert_eq!(err.kind(), ErrorKind::Configuration);
  assert_eq!(stats.executions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_enumeration_yields_empty_combiner() {
  let stats = Arc::new(Stats::default());
  let defs = counting_fork_join(&[]);

  let result = executor(&stats).run(&defs, window(), "fork").await.unwrap();

  assert!(result.output("combiner").unwrap().as_combiner().unwrap().is_empty());
  assert_eq!(stats.executions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_enumeration_below_minimum_fails() {
  let stats = Arc::new(Stats::default());
  let mut defs = counting_fork_join(&[]);
  defs[3] = defs[3]
    .clone()
    .with_param("min_successful_branches", json!(1));

  let err = executor(&stats).run(&defs, window(), "fork").await.unwrap_err();

  assert!(matches!(
    err,
    PipelineError::InsufficientBranches { succeeded: 0, required: 1, .. }
  ));
}

#[tokio::test]
async fn test_rerunning_completed_node_is_noop() {
  let stats = Arc::new(Stats::default());
  let executor = executor(&stats);
  let plan = executor
    .build_plan(&counting_fork_join(&["1", "2", "3"]), &window())
    .unwrap();
  let store = Arc::new(ResultStore::new());

  executor
    .execute_plan_node(&plan, store.clone(), "fork")
    .await
    .unwrap();
  let keys = store.keys();
  executor
    .execute_plan_node(&plan, store.clone(), "fork")
    .await
    .unwrap();

  assert_eq!(stats.executions.load(Ordering::SeqCst), 3);
  assert_eq!(store.keys(), keys);
  assert!(store.contains(&ContextKey::new("fork", "combiner")));
  assert!(store.contains(&ContextKey::new("item@fork[2]", "result")));
}

#[tokio::test]
async fn test_deadline_exceeded_returns_timeout() {
  let stats = Arc::new(Stats::default());
  let config = EngineConfig {
    timeout_ms: Some(50),
    ..EngineConfig::default()
  };
  let mut defs = counting_fork_join(&["1", "2"]);
  defs[1] = defs[1].clone().with_param("sleep_ms", json!(5_000));

  let err = executor_with(&stats, config)
    .run(&defs, window(), "fork")
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Timeout { ref node_name, timeout_ms: 50, .. } if node_name == "fork"
  ));
  assert_eq!(err.kind(), ErrorKind::Timeout);
  assert_eq!(err.node_type(), Some("ForkJoin"));
}

#[tokio::test]
async fn test_deadline_stops_in_flight_branches() {
  let stats = Arc::new(Stats::default());
  let config = EngineConfig {
    worker_pool_size: 1,
    timeout_ms: Some(50),
    ..EngineConfig::default()
  };
  let mut defs = counting_fork_join(&["1", "2", "3"]);
  defs[1] = defs[1].clone().with_param("sleep_ms", json!(200));

  let err = executor_with(&stats, config)
    .run(&defs, window(), "fork")
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Timeout);

  tokio::time::sleep(Duration::from_millis(800)).await;
  assert_eq!(stats.executions.load(Ordering::SeqCst), 1);
  assert_eq!(stats.finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pipeline_timeout_overrides_engine() {
  let stats = Arc::new(Stats::default());
  let config = EngineConfig {
    timeout_ms: None,
    ..EngineConfig::default()
  };
  let mut nodes = counting_fork_join(&["1"]);
  nodes[1] = nodes[1].clone().with_param("sleep_ms", json!(5_000));
  let pipeline = PipelineDef {
    pipeline_id: "p-1".to_string(),
    name: "slow".to_string(),
    root: "fork".to_string(),
    timeout_ms: Some(30),
    nodes,
  };

  let err = executor_with(&stats, config)
    .run_pipeline(&pipeline, window(), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, PipelineError::Timeout { timeout_ms: 30, .. }));
}

#[tokio::test]
async fn test_external_cancellation() {
  let stats = Arc::new(Stats::default());
  let config = EngineConfig {
    timeout_ms: None,
    ..EngineConfig::default()
  };
  let mut defs = counting_fork_join(&["1", "2"]);
  defs[1] = defs[1].clone().with_param("sleep_ms", json!(5_000));

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });

  let err = executor_with(&stats, config)
    .run_with_cancel(&defs, window(), "fork", cancel)
    .await
    .unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_fail_fast_fails_fork_join() {
  let stats = Arc::new(Stats::default());
  let defs = counting_fork_join(&["1", "boom", "3"]);

  let err = executor(&stats).run(&defs, window(), "fork").await.unwrap_err();

  match err {
    PipelineError::BranchFailed {
      node_name,
      branch,
      source,
      ..
    } => {
      assert_eq!(node_name, "fork");
      assert_eq!(branch, "item@fork[1]");
      assert_eq!(source.node_name(), Some("item@fork[1]"));
      assert_eq!(source.kind(), ErrorKind::Execution);
    }
    other => panic!("expected BranchFailed, got {:?}", other),
  }
}

#[tokio::test]
async fn test_fail_fast_cancels_sibling_branches() {
  let stats = Arc::new(Stats::default());
  let defs = vec![
    enumerator(
      "enumerator",
      json!([
        { "key": "boom", "sleep": 0 },
        { "key": "1", "sleep": 300 },
        { "key": "2", "sleep": 300 }
      ]),
    ),
    counting("item", "${key}").with_param("sleep_ms", json!("${sleep}")),
    combiner("combiner"),
    fork_join("fork", "enumerator", "item", "combiner"),
  ];

  let err = executor(&stats).run(&defs, window(), "fork").await.unwrap_err();
  assert!(matches!(err, PipelineError::BranchFailed { .. }));

  tokio::time::sleep(Duration::from_millis(600)).await;
  assert_eq!(stats.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_best_effort_records_failures() {
  let stats = Arc::new(Stats::default());
  let mut defs = counting_fork_join(&["1", "boom", "3"]);
  defs[3] = defs[3]
    .clone()
    .with_param("failure_policy", json!("best_effort"));

  let result = executor(&stats).run(&defs, window(), "fork").await.unwrap();

  let combined = result.output("combiner").unwrap().as_combiner().unwrap();
  assert_eq!(combined.len(), 3);
  assert_eq!(combined.successes().count(), 2);
  let failures: Vec<_> = combined.failures().collect();
  assert_eq!(failures.len(), 1);
  assert_eq!(failures[0].0, "item@fork[1]");
  assert_eq!(failures[0].1.node_type, "CountingEcho");
  assert!(failures[0].1.message.contains("echo exploded"));
}

#[tokio::test]
async fn test_engine_default_policy_applies() {
  let stats = Arc::new(Stats::default());
  let config = EngineConfig {
    failure_policy: vigil_config::FailurePolicy::BestEffort,
    ..EngineConfig::default()
  };
  let mut defs = counting_fork_join(&["1", "boom"]);
  defs[3] = defs[3]
    .clone()
    .with_param("min_successful_branches", json!(2));

  let err = executor_with(&stats, config)
    .run(&defs, window(), "fork")
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    PipelineError::InsufficientBranches { succeeded: 1, required: 2, .. }
  ));
}

#[tokio::test]
async fn test_nested_fork_join_keys_are_unique() {
  let stats = Arc::new(Stats::default());
  let executor = executor(&stats);
  let defs = vec![
    enumerator("regions", json!([{ "region": "us" }, { "region": "eu" }])),
    enumerator("metrics", json!([{ "metric": "a" }, { "metric": "b" }])),
    counting("leaf", "${region}-${metric}"),
    combiner("inner_combiner"),
    fork_join("inner", "metrics", "leaf", "inner_combiner"),
    combiner("outer_combiner"),
    fork_join("outer", "regions", "inner", "outer_combiner"),
  ];
  let plan = executor.build_plan(&defs, &window()).unwrap();
  let store = Arc::new(ResultStore::new());

  executor
    .execute_plan_node(&plan, store.clone(), "outer")
    .await
    .unwrap();

  assert_eq!(stats.executions.load(Ordering::SeqCst), 4);
  for (i, j) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
    let key = ContextKey::new(format!("leaf@inner@outer[{}][{}]", i, j), "result");
    assert!(store.contains(&key), "missing {}", key);
  }

  let outer = store
    .get(&ContextKey::new("outer", "combiner"))
    .unwrap();
  let outer = outer.as_combiner().unwrap();
  let branch_keys: Vec<&String> = outer.results().keys().collect();
  assert_eq!(branch_keys, vec!["inner@outer[0]", "inner@outer[1]"]);

  let texts: BTreeSet<String> = outer
    .results()
    .values()
    .flat_map(|inner| echo_texts(inner))
    .collect();
  assert_eq!(
    texts,
    BTreeSet::from([
      "us-a".to_string(),
      "us-b".to_string(),
      "eu-a".to_string(),
      "eu-b".to_string()
    ])
  );
}

#[tokio::test]
async fn test_enumeration_from_fetched_table() {
  let stats = Arc::new(Stats::default());
  let executor = PlanExecutor::new(
    Arc::new(registry(&stats)),
    Collaborators::new().with_data_source_cache(Arc::new(MetricCache)),
    EngineConfig::default(),
  );
  let defs = vec![
    PlanNodeDef::new("fetch", "DataFetcher")
      .with_param("data_source", json!("pinot"))
      .with_param("query", json!("select distinct metric")),
    PlanNodeDef::new("enumerator", "Enumerator")
      .with_input(InputBinding::new("fetch", "table", "items")),
    counting("item", "${metric}"),
    combiner("combiner"),
    fork_join("fork", "enumerator", "item", "combiner"),
  ];

  let result = executor.run(&defs, window(), "fork").await.unwrap();

  assert_eq!(
    echo_texts(result.output("combiner").unwrap()),
    BTreeSet::from(["clicks".to_string(), "views".to_string()])
  );
}

#[tokio::test]
async fn test_worker_pool_bounds_concurrency() {
  let stats = Arc::new(Stats::default());
  let config = EngineConfig {
    worker_pool_size: 1,
    ..EngineConfig::default()
  };
  let mut defs = counting_fork_join(&["1", "2", "3", "4"]);
  defs[1] = defs[1].clone().with_param("sleep_ms", json!(10));

  executor_with(&stats, config)
    .run(&defs, window(), "fork")
    .await
    .unwrap();

  assert_eq!(stats.executions.load(Ordering::SeqCst), 4);
  assert_eq!(stats.max_running.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_configuration_errors() {
  let stats = Arc::new(Stats::default());
  let executor = executor(&stats);

  let unknown_type = vec![PlanNodeDef::new("x", "Mystery")];
  let err = executor.run(&unknown_type, window(), "x").await.unwrap_err();
  assert!(matches!(err, PipelineError::UnknownOperatorType { .. }));

  let duplicate = vec![counting("x", "1"), counting("x", "2")];
  let err = executor.run(&duplicate, window(), "x").await.unwrap_err();
  assert!(matches!(err, PipelineError::DuplicateNode { .. }));

  let dangling = vec![combiner("c").with_input(InputBinding::new("ghost", "result", "g"))];
  let err = executor.run(&dangling, window(), "c").await.unwrap_err();
  assert!(matches!(err, PipelineError::DanglingReference { .. }));

  let err = executor
    .run(&[counting("x", "1")], window(), "missing")
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::UnknownNode { .. }));

  assert_eq!(stats.executions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_execution_events_are_emitted() {
  let stats = Arc::new(Stats::default());
  let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
  let executor = executor(&stats).with_notifier(vigil_engine::ChannelNotifier::new(tx));
  let defs = vec![counting("echo", "hi")];

  let result = executor.run(&defs, window(), "echo").await.unwrap();

  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }
  assert_eq!(
    events.first(),
    Some(&ExecutionEvent::PipelineStarted {
      execution_id: result.execution_id.clone(),
      root: "echo".to_string(),
    })
  );
  assert!(events.contains(&ExecutionEvent::NodeCompleted {
    execution_id: result.execution_id.clone(),
    node_name: "echo".to_string(),
    outputs: vec!["result".to_string()],
  }));
  assert_eq!(
    events.last(),
    Some(&ExecutionEvent::PipelineCompleted {
      execution_id: result.execution_id.clone(),
    })
  );
}
