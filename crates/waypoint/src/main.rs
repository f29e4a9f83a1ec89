use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use waypoint_engine::config::{ConfigLoader, WaypointConfig};
use waypoint_engine::formatter::{format_element, format_run};
use waypoint_engine::orchestrator::Orchestrator;
use waypoint_engine::plan::{Plan, PlanCache};
use waypoint_engine::resolution::CandidateScorer;
use waypoint_engine::session::{SessionError, SessionStore};
use waypoint_engine::surface::Surface;
use waypoint_h::HeadlessSurface;

#[derive(Parser)]
#[command(name = "waypoint", version, about = "Intent-driven UI step runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a plan against a headless browser (Chromium)
    Run(RunArgs),
    /// Rank a saved perception snapshot against one intent
    Score {
        /// perception.json written by a previous run
        #[arg(long)]
        perception: PathBuf,
        #[arg(long)]
        intent: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Plan file (JSON array of {intent, expected_state})
    #[arg(long, conflicts_with = "task")]
    plan: Option<PathBuf>,
    /// Application name, used for cached plans and stored sessions
    #[arg(long)]
    app: Option<String>,
    /// Task to look up in the plan cache (requires --app)
    #[arg(long, requires = "app")]
    task: Option<String>,
    #[arg(long)]
    start_url: Option<String>,
    /// Root directory for per-step artifacts
    #[arg(long)]
    artifacts: Option<PathBuf>,
    #[arg(long)]
    max_attempts: Option<u32>,
    /// Launch browser in visible mode (not headless)
    #[arg(long)]
    visible: bool,
    /// YAML config file (defaults to ./waypoint.yaml, then ~/.waypoint/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip restoring a stored session
    #[arg(long)]
    no_session: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::Score {
            perception,
            intent,
            top_k,
        } => score(&perception, &intent, top_k).await,
    }
}

async fn load_config(args: &RunArgs) -> anyhow::Result<WaypointConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };

    if let Some(app) = &args.app {
        config.run.app_name = app.clone();
    }
    if let Some(url) = &args.start_url {
        config.run.start_url = url.clone();
    }
    if let Some(dir) = &args.artifacts {
        config.run.artifact_root = dir.clone();
    }
    if let Some(max) = args.max_attempts {
        if max == 0 {
            bail!("--max-attempts must be at least 1");
        }
        config.run.max_attempts = max;
    }
    if args.visible {
        config.surface.visible = true;
    }
    if let Some(plan) = &args.plan {
        config.run.plan_path = Some(plan.clone());
    }
    Ok(config)
}

async fn resolve_plan(args: &RunArgs, config: &WaypointConfig) -> anyhow::Result<Plan> {
    if let Some(task) = &args.task {
        let cache = PlanCache::new(config.paths.plans_dir.clone());
        return cache
            .get(&config.run.app_name, task)
            .await
            .with_context(|| format!("no usable plan for task '{}'", task));
    }
    match &config.run.plan_path {
        Some(path) => Plan::load(path)
            .await
            .with_context(|| format!("loading plan {}", path.display())),
        None => bail!("a plan is required: pass --plan <file> or --app <a> --task <t>"),
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args).await?;
    let plan = resolve_plan(&args, &config).await?;
    info!("Loaded plan with {} steps", plan.len());

    let session = if args.no_session || config.run.app_name.is_empty() {
        None
    } else {
        let store = SessionStore::new(config.paths.sessions_dir.clone());
        match store.load(&config.run.app_name).await {
            Ok(state) => Some(state),
            Err(SessionError::NotFound(app)) => {
                info!("No stored session for {}", app);
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable session: {}", e);
                None
            }
        }
    };

    let mut surface = HeadlessSurface::new(config.surface.clone());
    let orchestrator = Orchestrator::new(config);
    let outcome = orchestrator.run(&mut surface, &plan, session.as_ref()).await;

    if let Err(e) = surface.close().await {
        warn!("Failed to close browser: {}", e);
    }

    let summary = outcome?;
    println!("{}", format_run(&summary.records()));
    println!("Artifacts: {}", orchestrator.store().root().display());
    Ok(())
}

async fn score(perception: &Path, intent: &str, top_k: usize) -> anyhow::Result<()> {
    let scorer = CandidateScorer::new(intent);
    let ranked = scorer.rank_path(perception).await;
    if ranked.is_empty() {
        println!("No candidates.");
        return Ok(());
    }

    for (i, candidate) in ranked.iter().take(top_k.max(1)).enumerate() {
        println!(
            "{}. {:.3} {}",
            i + 1,
            candidate.score,
            format_element(&candidate.element)
        );
        println!("   {}", serde_json::to_string(&candidate.features)?);
    }
    Ok(())
}
