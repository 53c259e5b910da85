use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vigil_config::{EvaluationWindow, PipelineDef};
use vigil_engine::{EngineConfig, PlanExecutor};
use vigil_operator::{Collaborators, StaticRegistry};

/// Vigil - runs detection pipelines over an evaluation window
#[derive(Parser)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a pipeline and print the root node's outputs
  Run {
    /// Path to the pipeline file (JSON)
    pipeline_file: PathBuf,

    /// Window start (RFC 3339)
    #[arg(long)]
    start: DateTime<Utc>,

    /// Window end (RFC 3339)
    #[arg(long)]
    end: DateTime<Utc>,

    /// Node to run instead of the pipeline's root
    #[arg(long)]
    root: Option<String>,

    /// Path to an engine config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
  },

  /// Build the plan and report configuration errors without running it
  Validate {
    /// Path to the pipeline file (JSON)
    pipeline_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run {
      pipeline_file,
      start,
      end,
      root,
      config,
    }) => {
      let window = EvaluationWindow::new(start, end).context("invalid evaluation window")?;
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_pipeline(pipeline_file, window, root, config))?;
    }
    Some(Commands::Validate { pipeline_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(validate_pipeline(pipeline_file))?;
    }
    None => {
      println!("vigil - use --help to see available commands");
    }
  }

  Ok(())
}

async fn run_pipeline(
  pipeline_file: PathBuf,
  window: EvaluationWindow,
  root: Option<String>,
  config_file: Option<PathBuf>,
) -> Result<()> {
  let mut pipeline = load_pipeline(&pipeline_file).await?;
  if let Some(root) = root {
    pipeline.root = root;
  }

  let config = match config_file {
    Some(path) => load_config(&path).await?,
    None => EngineConfig::default(),
  };

  eprintln!("Loaded pipeline: {} ({} nodes)", pipeline.name, pipeline.nodes.len());

  let executor = executor(config);

  let cancel = CancellationToken::new();
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupt_received");
      on_signal.cancel();
    }
  });

  let result = executor
    .run_pipeline(&pipeline, window, cancel)
    .await
    .context("pipeline execution failed")?;

  eprintln!("Execution completed: {}", result.execution_id);

  println!("{}", serde_json::to_string_pretty(&result)?);

  Ok(())
}

async fn validate_pipeline(pipeline_file: PathBuf) -> Result<()> {
  let pipeline = load_pipeline(&pipeline_file).await?;
  let executor = executor(EngineConfig::default());

  // Node construction does not depend on the window; a zero-length one is enough.
  let now = Utc::now();
  let window = EvaluationWindow::new(now, now)?;
  let plan = executor
    .build_plan(&pipeline.nodes, &window)
    .context("pipeline is invalid")?;

  if !plan.contains(&pipeline.root) {
    anyhow::bail!("root node '{}' is not defined", pipeline.root);
  }

  println!("Pipeline '{}' is valid ({} nodes)", pipeline.name, plan.len());

  Ok(())
}

fn executor(config: EngineConfig) -> PlanExecutor {
  // No external collaborators are wired in from the command line.
  let registry = StaticRegistry::with_builtins();
  PlanExecutor::new(Arc::new(registry), Collaborators::new(), config)
}

async fn load_pipeline(path: &Path) -> Result<PipelineDef> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read pipeline file: {}", path.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse pipeline file: {}", path.display()))
}

async fn load_config(path: &Path) -> Result<EngineConfig> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read config file: {}", path.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))
}
