//! Campaign Insights: A/B testing and budget allocation for two marketing
//! campaigns.
//!
//! Runs the interactive operator menu, or a single stage when a subcommand
//! is given.

use campaign_core::config::AppConfig;
use campaign_pipeline::menu::{self, Flow, MenuAction, MENU};
use campaign_pipeline::Session;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-insights")]
#[command(about = "A/B test analysis and budget allocation for marketing campaigns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Dataset CSV path (overrides config)
    #[arg(long, global = true, env = "CAMPAIGN_INSIGHTS__PATHS__DATA_PATH")]
    data_path: Option<PathBuf>,

    /// Results directory (overrides config)
    #[arg(long, global = true, env = "CAMPAIGN_INSIGHTS__PATHS__RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    /// Significance level (overrides config)
    #[arg(long, global = true, env = "CAMPAIGN_INSIGHTS__ANALYSIS__ALPHA")]
    alpha: Option<f64>,

    /// Total budget to allocate (overrides config)
    #[arg(long, global = true, env = "CAMPAIGN_INSIGHTS__OPTIMISER__TOTAL_BUDGET")]
    budget: Option<f64>,

    /// Users to generate (overrides config)
    #[arg(long, global = true, env = "CAMPAIGN_INSIGHTS__GENERATOR__N_SAMPLES")]
    samples: Option<usize>,

    /// Generator seed (overrides config)
    #[arg(long, global = true, env = "CAMPAIGN_INSIGHTS__GENERATOR__SEED")]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Generate a synthetic dataset
    Generate,
    /// Run the A/B test on the dataset
    Analyze,
    /// Analyse, then allocate the budget
    Optimize,
    /// Analyse, optimise and write the charts
    Visualize,
    /// Analyse, optimise and write the report
    Report,
    /// Run the full pipeline
    Run,
}

const DEFAULT_LOG_FILTER: &str = "campaign_insights=info,campaign_pipeline=info,\
     campaign_core=info,campaign_analytics=info,campaign_reporting=info";

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(path) = &cli.data_path {
        config.paths.data_path = path.clone();
    }
    if let Some(dir) = &cli.results_dir {
        config.paths.plots_dir = dir.join("plots");
        config.paths.results_dir = dir.clone();
    }
    if let Some(alpha) = cli.alpha {
        config.analysis.alpha = alpha;
    }
    if let Some(budget) = cli.budget {
        config.optimiser.total_budget = budget;
    }
    if let Some(samples) = cli.samples {
        config.generator.n_samples = samples;
    }
    if let Some(seed) = cli.seed {
        config.generator.seed = seed;
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    info!("Campaign Insights starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    apply_overrides(&mut config, &cli);

    info!(
        data_path = %config.paths.data_path.display(),
        results_dir = %config.paths.results_dir.display(),
        alpha = config.analysis.alpha,
        total_budget = config.optimiser.total_budget,
        "Configuration loaded"
    );

    let mut session = Session::new(config)?;

    match cli.command {
        Some(command) => run_command(&mut session, command),
        None => run_menu(&mut session),
    }
}

/// Non-interactive stages. Each one runs its prerequisites first, loading the
/// dataset from disk rather than regenerating it. A missing prerequisite is
/// reported as a warning and the process still exits cleanly.
fn run_command(session: &mut Session, command: Command) -> anyhow::Result<()> {
    let steps: &[MenuAction] = match command {
        Command::Generate => &[MenuAction::GenerateData],
        Command::Analyze => &[MenuAction::RunAnalysis],
        Command::Optimize => &[MenuAction::RunAnalysis, MenuAction::RunOptimisation],
        Command::Visualize => &[
            MenuAction::RunAnalysis,
            MenuAction::RunOptimisation,
            MenuAction::GenerateVisualisations,
        ],
        Command::Report => &[
            MenuAction::RunAnalysis,
            MenuAction::RunOptimisation,
            MenuAction::GenerateReport,
        ],
        Command::Run => &[MenuAction::RunFullPipeline],
    };

    let outcome = menu::run_steps(session, steps)?;
    for text in &outcome.output {
        println!("{text}");
    }
    if let Some(e) = outcome.skipped {
        println!("Warning: {e}");
    }
    Ok(())
}

fn run_menu(session: &mut Session) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        println!("\n{MENU}");
        print!("Choose an option: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            // EOF on stdin ends the session like "0".
            break;
        };
        let action = match line?.parse::<MenuAction>() {
            Ok(action) => action,
            Err(e) => {
                println!("{e}. Please choose 0-6.");
                continue;
            }
        };

        match menu::execute(session, action) {
            Ok(Flow::Continue(text)) => println!("{text}"),
            Ok(Flow::Exit) => break,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Action skipped");
                println!("Warning: {e}");
            }
            Err(e) => {
                error!(error = %e, ?action, "Action failed");
                println!("Error: {e}");
            }
        }
    }

    info!("Exiting. Goodbye!");
    Ok(())
}
