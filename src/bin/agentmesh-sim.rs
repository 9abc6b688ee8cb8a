//! agentmesh-sim - drive the coordination core with simulated agents
//!
//! Usage:
//!   agentmesh-sim                              → 3 agents, 5 rounds, defaults
//!   agentmesh-sim --agents 5 --rounds 20       → larger run
//!   agentmesh-sim --config mesh.toml           → load tunables from TOML
//!   agentmesh-sim --dump-config > mesh.toml    → write the default config

use agentmesh_coordination::{
    Assignment, CoordinationFacade, TaskBody, TaskContext, WorkflowResult,
};
use agentmesh_core::{AgentDescriptor, Error, MeshConfig, Result, TaskDescriptor, TaskOutcome};
use agentmesh_learning::Observation;
use async_trait::async_trait;
use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser)]
#[command(
    name = "agentmesh-sim",
    about = "Run simulated agents through the agentmesh coordination core",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Path to a mesh config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective config as TOML and exit
    #[arg(long, default_value_t = false)]
    dump_config: bool,

    /// Number of simulated agents
    #[arg(short, long, default_value_t = 3)]
    agents: usize,

    /// Number of multi-agent rounds
    #[arg(short, long, default_value_t = 5)]
    rounds: usize,

    /// Fraction of tasks that fail, in [0, 1]
    #[arg(long, default_value_t = 0.2)]
    failure_rate: f64,

    /// Write logs to a file (in addition to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref(), cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => MeshConfig::load(path),
        None => MeshConfig::default(),
    };
    config.validate()?;

    if cli.dump_config {
        print!("{}", config.to_toml());
        return Ok(());
    }
    if !(0.0..=1.0).contains(&cli.failure_rate) {
        anyhow::bail!("--failure-rate must be within [0, 1]");
    }

    let facade = Arc::new(CoordinationFacade::new(&config)?);
    let agents = register_agents(&facade, cli.agents.max(1))?;

    let cancel = CancellationToken::new();
    let consolidation = facade.spawn_consolidation(cancel.clone());

    let body: Arc<dyn TaskBody> = Arc::new(SimulatedWork::new(cli.failure_rate));
    let mut completed = 0usize;
    for round in 0..cli.rounds {
        feed_background(&facade, round);
        match run_round(&facade, &agents, &body, round).await {
            Ok(result) => {
                completed += 1;
                info!(round, workflow = %result.workflow_id, success = result.success, "Round finished");
            }
            Err(e) => warn!(round, error = %e, "Round failed"),
        }
    }

    let learned = facade.auto_learn();
    cancel.cancel();
    consolidation.await?;

    let report = json!({
        "rounds": cli.rounds,
        "rounds_completed": completed,
        "learned_at_shutdown": learned,
        "health": facade.health_check(),
        "recommendations": facade.improvement_recommendations(),
        "knowledge": facade.memory().get_knowledge(None),
        "visualization": facade.visualization(None),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing(log_file: Option<&Path>, json: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agentmesh=info".into());
    let stderr = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("--log-file needs a file name"))?;
            let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file_layer)
        .init();
    Ok(guard)
}

fn register_agents(facade: &CoordinationFacade, count: usize) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let id = format!("agent-{}", i);
        let descriptor = if i == 0 {
            AgentDescriptor::new(&id, "Coordinator")
                .with_type("coordinator")
                .with_role("Lead coordinator of specialist agents")
                .with_trait("empathy", 0.8)
                .with_trait("analytical", 0.7)
        } else {
            AgentDescriptor::new(&id, format!("Specialist {}", i))
                .with_type("specialist")
                .with_capabilities(["search", "summarize"])
                .with_trait("detail_oriented", 0.6)
        };
        facade.register_agent(&descriptor)?;
        ids.push(id);
    }
    Ok(ids)
}

/// User traffic and code churn the agents would normally see.
fn feed_background(facade: &CoordinationFacade, round: usize) {
    const QUERIES: [&str; 3] = [
        "How much does a week in Lisbon cost?",
        "Best time to visit Lisbon?",
        "Any good food tours in Lisbon?",
    ];
    let memory = facade.memory();
    memory.observe(Observation::user_message(
        "traveler-1",
        QUERIES[round % QUERIES.len()],
    ));
    let change = if round % 2 == 0 { "bug_fix" } else { "feature" };
    memory.observe(Observation::code_change("src/planner.rs", change));
}

async fn run_round(
    facade: &CoordinationFacade,
    agents: &[String],
    body: &Arc<dyn TaskBody>,
    round: usize,
) -> Result<WorkflowResult> {
    let assignments: Vec<Assignment> = agents
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let task = TaskDescriptor::new(if i == 0 { "plan" } else { "research" })
                .with_payload(json!({ "round": round, "step": i }));
            Assignment::new(id.as_str(), task, body.clone())
        })
        .collect();
    facade.run_many(&assignments).await
}

/// Sleeps briefly and fails a fixed fraction of calls.
struct SimulatedWork {
    failure_rate: f64,
    calls: AtomicU64,
}

impl SimulatedWork {
    fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate,
            calls: AtomicU64::new(0),
        }
    }

    /// True on the calls where the running failure count ticks over.
    fn should_fail(&self, call: u64) -> bool {
        let before = (call as f64 * self.failure_rate).floor();
        let after = ((call + 1) as f64 * self.failure_rate).floor();
        after > before
    }
}

#[async_trait]
impl TaskBody for SimulatedWork {
    async fn run(&self, ctx: TaskContext) -> Result<TaskOutcome> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(5 + call % 15)).await;
        if self.should_fail(call) {
            return Err(Error::task_failed(
                ctx.agent_id.to_string(),
                format!("simulated failure on {}", ctx.task.task_type),
            ));
        }
        Ok(TaskOutcome::success(format!(
            "{} finished {} with {} known patterns",
            ctx.agent_id,
            ctx.task.task_type,
            ctx.knowledge.len()
        )))
    }
}
