// crates/wirecli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wirecore::{
    EventBus, ExecutionEvent, ExecutionStatus, InMemoryMemory, NodeDocument, RunOutcome,
    WorkflowDocument,
};
use wireruntime::{load_graph, validate, FlowRunner, NodeRegistry, RuntimeConfig};

#[derive(Parser)]
#[command(name = "wireflow")]
#[command(about = "Wireflow workflow engine CLI", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Runtime configuration JSON file
        #[arg(short, long, env = "WIREFLOW_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Validate a workflow file and print its execution order
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    wirenodes::register_all(&mut registry);
    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { file, config } => run_workflow(file, config).await?,
        Commands::Validate { file } => validate_workflow(file)?,
        Commands::Nodes => list_nodes(),
        Commands::Init { output } => create_example_workflow(output)?,
    }

    Ok(())
}

async fn run_workflow(file: PathBuf, config: Option<PathBuf>) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let document = WorkflowDocument::from_path(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let config = match config {
        Some(path) => RuntimeConfig::from_path(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };

    println!("   Nodes: {}", document.nodes.len());
    println!("   Connections: {}", document.connections.len());
    println!();

    let graph = load_graph(&document, &registry())?;
    let bus = Arc::new(EventBus::new(config.event_buffer_size));
    let mut events = bus.subscribe();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { run_id, .. } => {
                    println!("▶️  Run {} started", run_id);
                }
                ExecutionEvent::NodeStateChanged {
                    node_id,
                    status,
                    error,
                    duration_ms,
                    ..
                } => match status {
                    ExecutionStatus::Running => println!("  ⚡ Starting node: {}", node_id),
                    ExecutionStatus::Success => println!(
                        "  ✅ Node {} completed in {}ms",
                        node_id,
                        duration_ms.unwrap_or_default()
                    ),
                    ExecutionStatus::Error => println!(
                        "  ❌ Node {} failed: {}",
                        node_id,
                        error.unwrap_or_default()
                    ),
                    ExecutionStatus::Pending | ExecutionStatus::Skipped => {}
                },
                ExecutionEvent::RunCompleted {
                    outcome,
                    duration_ms,
                    ..
                } => {
                    match outcome {
                        RunOutcome::Finished => {
                            println!("✨ Workflow completed successfully in {}ms", duration_ms)
                        }
                        RunOutcome::Halted { node_id } => {
                            println!("💥 Workflow halted at {} after {}ms", node_id, duration_ms)
                        }
                        RunOutcome::Stopped { before } => {
                            println!("⏹️  Workflow stopped before {}", before)
                        }
                        RunOutcome::Aborted { reason } => {
                            println!("💥 Workflow aborted: {}", reason)
                        }
                    }
                    break;
                }
            }
        }
    });

    let runner = FlowRunner::new(graph)
        .with_config(config)
        .with_memory(Arc::new(InMemoryMemory::new()))
        .with_observer(bus);
    let result = runner.run().await;

    // The listener stops at RunCompleted or when the channel lags.
    if tokio::time::timeout(Duration::from_secs(1), event_task).await.is_err() {
        tracing::warn!("Event listener did not finish");
    }

    let report = result?;

    println!();
    println!("📊 Execution Summary:");
    println!("   Run ID: {}", report.run_id);
    let executed = report
        .states
        .iter()
        .filter(|(_, state)| state.status.is_terminal())
        .count();
    println!("   Executed: {}/{} nodes", executed, report.order.len());
    println!("   Duration: {}ms", report.duration.as_millis());

    let with_outputs: Vec<_> = report
        .states
        .iter()
        .filter(|(_, state)| !state.outputs.is_empty())
        .collect();
    if !with_outputs.is_empty() {
        println!();
        println!("📤 Outputs:");
        for (node_id, state) in with_outputs {
            println!("   Node {}:", node_id);
            for (key, value) in &state.outputs {
                println!("     {}: {}", key, value.to_text());
            }
        }
    }

    if let Some(node_id) = report.failed_node() {
        anyhow::bail!("workflow failed at node {}", node_id);
    }
    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let document = WorkflowDocument::from_path(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let order = validate(&document, &registry())?;

    println!("✅ Workflow is valid:");
    println!("   Nodes: {}", document.nodes.len());
    println!("   Connections: {}", document.connections.len());
    println!("   Execution order: {}", order.join(" → "));

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = registry();
    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(&node_type) {
            println!("  • {} ({})", node_type, metadata.category);
            println!("    {}", metadata.description);
            let ports = |specs: &[wirecore::PortSpec]| {
                specs
                    .iter()
                    .map(|p| format!("{}:{}", p.name, p.kind))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!(
                "    in: [{}]  out: [{}]",
                ports(&metadata.inputs),
                ports(&metadata.outputs)
            );
        } else {
            println!("  • {}", node_type);
        }
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let mut document = WorkflowDocument::new();

    let start = document.add_node(NodeDocument::new("start", "start").with_position(0.0, 100.0));
    let fetch = document.add_node(
        NodeDocument::new("fetch", "http.fetch")
            .with_data(json!({
                "url": "https://dev.to/api/articles?per_page=30",
            }))
            .with_position(200.0, 100.0),
    );
    let filter = document.add_node(
        NodeDocument::new("filter", "filter.keyword")
            .with_data(json!({ "keywords": ["rust", "wasm"], "field": "title" }))
            .with_position(400.0, 100.0),
    );
    let summarize = document.add_node(
        NodeDocument::new("summarize", "text.summarize")
            .with_data(json!({ "max_items": 5, "field": "title", "heading": "Today in Rust" }))
            .with_position(600.0, 100.0),
    );
    let log = document.add_node(
        NodeDocument::new("log", "debug.log")
            .with_data(json!({ "prefix": "DIGEST" }))
            .with_position(800.0, 100.0),
    );

    document.connect(start, "exec", fetch.clone(), "exec");
    document.connect(fetch, "posts", filter.clone(), "posts");
    document.connect(filter, "output", summarize.clone(), "input");
    document.connect(summarize, "summary", log, "message");

    std::fs::write(&output, document.to_json_pretty()?)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  wireflow run --file {}", output.display());

    Ok(())
}
