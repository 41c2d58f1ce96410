//! Lectern CLI: the main entry point.
//!
//! Commands:
//! - `generate`  Run every enabled task type over a source file
//! - `bound`     Show the bounded context one task type would receive
//! - `stats`     Size statistics for a source file
//! - `onboard`   Write a default config file
//! - `doctor`    Validate config and check provider health

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lectern_core::TaskType;

mod commands;

#[derive(Parser)]
#[command(
    name = "lectern",
    about = "Lectern: study material from long texts, one bounded prompt at a time",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.lectern/config.toml
    #[arg(short, long, global = true, env = "LECTERN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate study material for a source file
    Generate {
        /// Source text (or HTML with --html)
        #[arg(short, long)]
        input: PathBuf,

        /// Unit id used for results and error markers (defaults to the file stem)
        #[arg(short, long)]
        unit: Option<String>,

        /// Restrict to these task types (repeatable)
        #[arg(short, long = "task", value_parser = commands::parse_task)]
        tasks: Vec<TaskType>,

        /// Treat the input as HTML and normalize it first
        #[arg(long)]
        html: bool,
    },

    /// Print the bounded context for one task type
    Bound {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, value_parser = commands::parse_task)]
        task: TaskType,

        #[arg(long)]
        html: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print size statistics for a source file
    Stats {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        html: bool,
    },

    /// Initialize configuration
    Onboard,

    /// Diagnose configuration and provider health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config;
    match cli.command {
        Commands::Generate {
            input,
            unit,
            tasks,
            html,
        } => {
            let config = commands::load_config(config_path.as_deref())?;
            commands::generate::run(config, &input, unit, tasks, html).await?
        }
        Commands::Bound {
            input,
            task,
            html,
            json,
        } => {
            let config = commands::load_config(config_path.as_deref())?;
            commands::bound::run(&config, &input, task, html, json)?
        }
        Commands::Stats { input, html } => {
            let config = commands::load_config(config_path.as_deref())?;
            commands::stats::run(&config, &input, html)?
        }
        Commands::Onboard => commands::onboard::run(config_path.as_deref())?,
        Commands::Doctor => commands::doctor::run(config_path.as_deref()).await?,
    }

    Ok(())
}
