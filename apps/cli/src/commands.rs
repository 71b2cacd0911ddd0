//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use deepresearch_core::{ProgressReporter, ResearchService, StageId};
use deepresearch_llm::ModelClient;
use deepresearch_shared::{AppConfig, ResolvedConfig, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// deepresearch — multi-agent web research backed by a local model.
#[derive(Parser)]
#[command(
    name = "deepresearch",
    version,
    about = "Research a question with a web searcher, an analyst and a writer running on a local model.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full research pipeline and print the final answer.
    Research {
        /// The question to research.
        query: String,

        /// Print every stage's output, not just the final answer.
        #[arg(long)]
        stages: bool,
    },

    /// Search the web directly, without any agents.
    Quick {
        /// Search query.
        query: String,
    },

    /// Local model management.
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Check credentials and the model server.
    Doctor,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Model subcommands.
#[derive(Subcommand)]
pub(crate) enum ModelAction {
    /// Report whether the configured model is installed.
    Check,
    /// Download the configured model.
    Pull,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "deepresearch=info",
        1 => "deepresearch=debug",
        _ => "deepresearch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Research { query, stages } => cmd_research(&query, stages).await,
        Command::Quick { query } => cmd_quick(&query).await,
        Command::Model { action } => match action {
            ModelAction::Check => cmd_model_check().await,
            ModelAction::Pull => cmd_model_pull().await,
        },
        Command::Doctor => cmd_doctor().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn resolved_config() -> Result<ResolvedConfig> {
    Ok(load_config()?.resolve()?)
}

fn research_service() -> Result<ResearchService> {
    Ok(ResearchService::from_config(&resolved_config()?)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_research(query: &str, show_stages: bool) -> Result<()> {
    let service = research_service()?;
    info!(query, "researching");

    let progress = Arc::new(CliProgress::new());
    let reporter: Arc<dyn ProgressReporter> = progress.clone();

    if !show_stages {
        let answer = service.conduct_research_with(query, reporter).await;
        progress.finish();
        println!("{answer}");
        return Ok(());
    }

    let start = Instant::now();
    let result = service.run(query, reporter).await;
    progress.finish();
    let run = result?;

    for stage in run.completed() {
        let output = run.output(stage).unwrap_or_default();
        println!("## {stage}");
        println!();
        println!("{output}");
        println!();
    }
    println!(
        "Run {} started {} and finished in {:.1}s",
        run.id(),
        run.started_at().format("%Y-%m-%d %H:%M:%S UTC"),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

async fn cmd_quick(query: &str) -> Result<()> {
    let service = research_service()?;
    println!("{}", service.quick_search(query).await);
    Ok(())
}

async fn cmd_model_check() -> Result<()> {
    let client = ModelClient::new(resolved_config()?.model)?;
    let model = client.model_name().to_string();

    if client.check_model_availability().await {
        println!("Model '{model}' is available.");
        Ok(())
    } else {
        Err(eyre!(
            "model '{model}' is not available. Run `deepresearch model pull` to download it."
        ))
    }
}

async fn cmd_model_pull() -> Result<()> {
    let client = ModelClient::new(resolved_config()?.model)?;
    let model = client.model_name().to_string();

    let spinner = spinner();
    spinner.set_message(format!("Pulling {model}"));
    let pulled = client.pull_model().await;
    spinner.finish_and_clear();

    if pulled {
        println!("Model '{model}' pulled successfully.");
        Ok(())
    } else {
        Err(eyre!("failed to pull model '{model}'"))
    }
}

async fn cmd_doctor() -> Result<()> {
    let service = research_service()?;
    let report = service.diagnose().await;

    let mark = |ok: bool| if ok { "ok" } else { "missing" };
    println!();
    println!("  Search API key:  {}", mark(report.search_configured));
    println!(
        "  Model server:    {}",
        if report.model_server_reachable { "reachable" } else { "unreachable" }
    );
    println!("  Models found:    {}", report.models_listed);
    println!("  Model:           {} ({})", report.model, mark(report.model_available));
    println!();

    if report.is_ready() {
        println!("  Ready for research.");
        Ok(())
    } else {
        Err(eyre!("setup incomplete; see the checks above"))
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");

    let resolved = config.resolve()?;
    println!("# resolved");
    println!("# model server: {}", resolved.model.base_url);
    println!("# model:        {}", resolved.model.model);
    println!(
        "# search key:   {}",
        if resolved.search.is_configured() { "set" } else { "not set" }
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid spinner template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = spinner();
        spinner.set_message("Starting research");
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: &StageId, role: &str, index: usize, total: usize) {
        self.spinner
            .set_message(format!("[{index}/{total}] {role} working on {stage}"));
    }

    fn stage_completed(&self, stage: &StageId, index: usize, total: usize) {
        self.spinner
            .println(format!("  ✓ [{index}/{total}] {stage} complete"));
    }
}
