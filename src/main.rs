use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsgate::config::{Config, LogFormat};
use newsgate::error::ErrorCategory;

mod commands;

use commands::{CollectArgs, Decision};

#[derive(Parser)]
#[command(
    name = "newsgate",
    version,
    about = "Configuration-driven news collector with a moderation queue",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (NEWSGATE_* variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect articles from the configured sites into the queue
    Collect {
        /// Sites file (YAML or TOML)
        #[arg(short, long)]
        sites: Option<PathBuf>,

        /// Maximum number of records for the whole run
        #[arg(short, long)]
        max_items: Option<usize>,

        /// Maximum number of records per site
        #[arg(long)]
        max_per_site: Option<usize>,

        /// Earliest publication date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest publication date, exclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Also write collected records as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not touch the queue
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Show the next pending item
    Review,

    /// Record a decision on a queued item
    Decide {
        /// Queue item id
        id: i64,

        /// Decision to apply
        #[arg(value_enum)]
        decision: Decision,

        /// Reviewer identifier
        #[arg(long, default_value = "cli")]
        reviewer: String,

        /// Publication slot for `schedule` (HH:MM, local time)
        #[arg(long)]
        at: Option<String>,
    },

    /// List queued items by date: YYYY-MM-DD or YYYY-MM-DD..YYYY-MM-DD
    Search {
        /// Date or range (default: last 7 days)
        range: Option<String>,
    },

    /// Show queue counters
    Stats,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;

    // Initialize tracing/logging
    setup_tracing(cli.log_format.unwrap_or(config.logging.format), cli.verbose)?;

    tracing::info!("newsgate starting");

    let result = match cli.command {
        Commands::Collect {
            sites,
            max_items,
            max_per_site,
            from,
            to,
            output,
            dry_run,
        } => {
            tracing::info!(
                sites = ?sites,
                max_items = ?max_items,
                from = ?from,
                to = ?to,
                dry_run = %dry_run,
                "Starting collect command"
            );
            commands::collect(
                config,
                CollectArgs {
                    sites,
                    max_items,
                    max_per_site,
                    from,
                    to,
                    output,
                    dry_run,
                },
            )
            .await
        }

        Commands::Review => commands::review(config).await,

        Commands::Decide {
            id,
            decision,
            reviewer,
            at,
        } => commands::decide(config, id, decision, reviewer, at).await,

        Commands::Search { range } => commands::search(config, range).await,

        Commands::Stats => commands::stats(config).await,
    };

    match &result {
        Ok(()) => tracing::info!("newsgate completed successfully"),
        Err(err) => match classify(err) {
            Some((category, recoverable)) => tracing::error!(
                error = %format!("{err:#}"),
                category = category.as_str(),
                recoverable,
                "newsgate failed"
            ),
            None => tracing::error!(error = %format!("{err:#}"), "newsgate failed"),
        },
    }

    result
}

/// Category and retryability of the first crate error in the chain
fn classify(err: &anyhow::Error) -> Option<(ErrorCategory, bool)> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<newsgate::error::Error>())
        .map(|e| (e.category(), e.is_recoverable()))
}

fn setup_tracing(format: LogFormat, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("newsgate=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("newsgate=info,warn")
    };

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}
